//! CLI argument definitions and `InvocationProfile` construction.
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use super::{log_directive, resolve_store_path, InvocationProfile};
use crate::settings::SettingsOverrides;

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Authenticate in the browser and store the API key as a context.
    #[command(
        after_help = "The authorization URL is always printed, so the login can be completed from another browser on this machine."
    )]
    Login(LoginArgs),
    /// Remove the stored API key of a context.
    Logout(LogoutArgs),
}

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Log in again even when a context for this API URL already has a key.
    #[arg(short = 'y', long = "yes", default_value_t = false)]
    pub assume_yes: bool,
    /// Do not try to open a browser; only print the URL.
    #[arg(long, default_value_t = false)]
    pub no_browser: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LogoutArgs {
    /// Context to log out of (defaults to the current context).
    #[arg(long)]
    pub context: Option<String>,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "StackEye command-line client", long_about = None)]
pub struct CliArgs {
    /// Path to the context store (overrides STACKEYE_CONFIG).
    #[arg(long = "config", global = true)]
    pub config_override: Option<PathBuf>,
    /// Platform API URL (overrides STACKEYE_API_URL).
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,
    /// Seconds to wait for the browser callback.
    #[arg(long = "timeout", value_name = "SECONDS", global = true)]
    pub timeout_secs: Option<u64>,
    /// Never prompt; fail when a decision would be needed.
    #[arg(long, default_value_t = false, global = true)]
    pub non_interactive: bool,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Fully resolved invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub profile: InvocationProfile,
    pub command: CliCommand,
}

impl CliArgs {
    pub fn into_invocation(self) -> Result<Invocation> {
        if self.timeout_secs == Some(0) {
            return Err(anyhow!("--timeout must be greater than zero"));
        }
        let store_path = resolve_store_path(self.config_override)?;
        let overrides = SettingsOverrides {
            api_url: self.api_url,
            login_timeout_secs: self.timeout_secs,
            non_interactive: self.non_interactive.then_some(true),
        };

        Ok(Invocation {
            profile: InvocationProfile {
                store_path,
                overrides,
                log_directive: log_directive(self.verbose),
            },
            command: self.command,
        })
    }
}
