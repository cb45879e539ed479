//! Browser-delegated login: loopback listener, callback handler, handshake and verification.
pub mod browser;
pub mod callback;
pub mod coordinator;
pub mod listener;
pub mod login;
pub mod target;
pub mod verifier;

pub use browser::{system_launcher, BrowserLauncher, CommandLauncher, PrintOnlyLauncher};
pub use callback::{CallbackPublisher, HandshakeResult, CALLBACK_PATH};
pub use coordinator::{CallbackServer, HandshakeCoordinator, HandshakeOptions, HandshakeState};
pub use listener::LoopbackListener;
pub use login::{login, logout, Confirm, LoginReport, LoginRequest, LogoutReport};
pub use target::AuthorizationTarget;
pub use verifier::{
    mask_credential, validate_credential_format, CredentialVerifier, VerifiedIdentity,
};
