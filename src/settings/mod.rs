//! Load and validate runtime settings (defaults, `STACKEYE_*` environment, CLI overrides).
use serde::Deserialize;
use tracing::error;

use crate::lib::errors::ConfigError;

pub mod api;
pub mod login;
pub mod telemetry;

pub use api::{normalize_api_url, parse_api_settings, ApiSettings, RawApiSettings, DEFAULT_API_URL};
pub use login::{
    parse_login_settings, LoginSettings, RawLoginSettings, DEFAULT_LOGIN_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_VERIFY_TIMEOUT_SECS,
};

pub(crate) const ENV_PREFIX: &str = "STACKEYE";

/// Top-level settings container handed to the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api: ApiSettings,
    pub login: LoginSettings,
}

/// Values supplied on the command line; they take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_url: Option<String>,
    pub login_timeout_secs: Option<u64>,
    pub non_interactive: Option<bool>,
}

impl SettingsOverrides {
    fn count(&self) -> usize {
        [
            self.api_url.is_some(),
            self.login_timeout_secs.is_some(),
            self.non_interactive.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    api_url: Option<String>,
    login_timeout_secs: Option<u64>,
    verify_timeout_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
    non_interactive: Option<bool>,
}

impl Settings {
    /// Resolve settings from the process environment and the given overrides.
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        Self::load_from_environment(environment_source(), overrides)
    }

    fn load_from_environment(
        environment: config::Environment,
        overrides: &SettingsOverrides,
    ) -> Result<Self, ConfigError> {
        telemetry::log_overrides(overrides.count());

        let document = build_document(environment, overrides).map_err(|err| {
            let error = ConfigError::from_build_error(err);
            error!(
                target: "stackeye::settings",
                reason = %error,
                "Failed to read settings"
            );
            error
        })?;

        let raw: RawSettings = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(err);
            error!(
                target: "stackeye::settings",
                reason = %error,
                "Failed to parse settings"
            );
            error
        })?;

        let settings = Self::from_raw(raw)?;
        telemetry::log_loaded(&settings);
        Ok(settings)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let api = parse_api_settings(RawApiSettings {
            api_url: raw.api_url,
        })?;
        let login = parse_login_settings(RawLoginSettings {
            login_timeout_secs: raw.login_timeout_secs,
            verify_timeout_secs: raw.verify_timeout_secs,
            shutdown_grace_secs: raw.shutdown_grace_secs,
            non_interactive: raw.non_interactive,
        })?;
        Ok(Self { api, login })
    }
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

fn build_document(
    environment: config::Environment,
    overrides: &SettingsOverrides,
) -> Result<config::Config, config::ConfigError> {
    config::Config::builder()
        .set_default("api_url", DEFAULT_API_URL)?
        .set_default("login_timeout_secs", DEFAULT_LOGIN_TIMEOUT_SECS as i64)?
        .set_default("verify_timeout_secs", DEFAULT_VERIFY_TIMEOUT_SECS as i64)?
        .set_default("shutdown_grace_secs", DEFAULT_SHUTDOWN_GRACE_SECS as i64)?
        .set_default("non_interactive", false)?
        .add_source(environment)
        .set_override_option("api_url", overrides.api_url.clone())?
        .set_override_option(
            "login_timeout_secs",
            overrides.login_timeout_secs.map(|secs| secs as i64),
        )?
        .set_override_option("non_interactive", overrides.non_interactive)?
        .build()
}
