//! Library crate root for the StackEye CLI login core.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod auth;
pub mod cli;
pub mod settings;
pub mod store;
