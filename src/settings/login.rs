use std::time::Duration;

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Handshake timing and interaction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSettings {
    /// How long to wait for the browser callback.
    pub timeout: Duration,
    /// Bound on the verification request.
    pub verify_timeout: Duration,
    /// Grace period for the callback server to drain after the handshake.
    pub shutdown_grace: Duration,
    /// Never prompt; fail instead of asking for confirmation.
    pub non_interactive: bool,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
            verify_timeout: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            non_interactive: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLoginSettings {
    pub login_timeout_secs: Option<u64>,
    pub verify_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
    pub non_interactive: Option<bool>,
}

pub fn parse_login_settings(raw: RawLoginSettings) -> Result<LoginSettings, ConfigError> {
    let timeout = positive_secs(
        raw.login_timeout_secs,
        DEFAULT_LOGIN_TIMEOUT_SECS,
        "login_timeout_secs",
    )?;
    let verify_timeout = positive_secs(
        raw.verify_timeout_secs,
        DEFAULT_VERIFY_TIMEOUT_SECS,
        "verify_timeout_secs",
    )?;
    let shutdown_grace = positive_secs(
        raw.shutdown_grace_secs,
        DEFAULT_SHUTDOWN_GRACE_SECS,
        "shutdown_grace_secs",
    )?;

    Ok(LoginSettings {
        timeout,
        verify_timeout,
        shutdown_grace,
        non_interactive: raw.non_interactive.unwrap_or(false),
    })
}

fn positive_secs(
    value: Option<u64>,
    default: u64,
    field: &'static str,
) -> Result<Duration, ConfigError> {
    match value.unwrap_or(default) {
        0 => Err(ConfigError::InvalidField {
            field,
            message: "must be at least 1 second".into(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
