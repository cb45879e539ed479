//! Terminal error reporting with stable exit codes.
use std::process::ExitCode;

use anyhow::Error;
use tracing::debug;

use crate::lib::errors::{ConfigError, LoginError};

/// Exit code for invalid settings or arguments.
pub const USAGE_EXIT_CODE: u8 = 2;

/// Bundles the single terminal message with the process exit code.
#[derive(Debug)]
pub struct CommandExit {
    message: String,
    exit_code: u8,
}

impl CommandExit {
    /// `<command> failed during <stage>: <message>` followed by the remediation hint.
    pub fn from_login_error(command: &str, err: &LoginError) -> Self {
        let descriptor = err.descriptor();
        debug!(
            target: "stackeye::auth",
            code = descriptor.code,
            stage = err.stage().as_str(),
            exit_code = descriptor.exit_code,
            "Command failed"
        );
        Self {
            message: format!(
                "{command} failed during {}: {err}\nhint: {}",
                err.stage(),
                descriptor.remediation
            ),
            exit_code: descriptor.exit_code,
        }
    }

    pub fn from_config_error(err: ConfigError) -> Self {
        Self {
            message: format!("invalid settings: {err}"),
            exit_code: USAGE_EXIT_CODE,
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:#}"),
            exit_code: 1,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn report(self) -> ExitCode {
        eprintln!("{}", self.message);
        ExitCode::from(self.exit_code)
    }
}
