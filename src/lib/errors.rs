use std::{fmt, io, net::IpAddr, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use thiserror::Error;

/// Errors that can occur while loading or validating runtime settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to assemble the layered settings sources.
    #[error("Failed to read settings: {source}")]
    Build {
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize the merged settings into a struct.
    #[error("Failed to parse settings: {source}")]
    Parse {
        #[source]
        source: ConfigLoaderError,
    },
    /// Field failed validation.
    #[error("Setting `{field}` is invalid: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a build failure.
    pub fn from_build_error(source: ConfigLoaderError) -> Self {
        Self::Build { source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(source: ConfigLoaderError) -> Self {
        Self::Parse { source }
    }
}

/// Errors raised while reading or writing the persisted context store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {source}")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("current_context `{name}` does not name a stored context")]
    DanglingCurrentContext { name: String },
}

/// Step of the login operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Preflight,
    Listener,
    Callback,
    Verification,
    Persistence,
}

impl LoginStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LoginStage::Preflight => "preflight",
            LoginStage::Listener => "listener startup",
            LoginStage::Callback => "browser callback",
            LoginStage::Verification => "credential verification",
            LoginStage::Persistence => "config persistence",
        }
    }
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata attached to each login failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// Stable error code.
    pub code: &'static str,
    /// Recommended remediation shown to the operator.
    pub remediation: &'static str,
    /// Process exit code.
    pub exit_code: u8,
}

impl ErrorDescriptor {
    /// Simple constructor.
    pub const fn new(code: &'static str, remediation: &'static str, exit_code: u8) -> Self {
        Self {
            code,
            remediation,
            exit_code,
        }
    }
}

pub const ALREADY_LOGGED_IN_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "already_logged_in",
    "Re-run with `--yes` to authenticate again, or `stackeye logout` first.",
    3,
);
pub const BIND_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "bind_error",
    "The loopback network stack refused an ephemeral port; check local firewall or socket limits.",
    70,
);
pub const NON_LOCAL_ORIGIN_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "non_local_origin",
    "The callback must come from this machine. Do not forward the callback port; re-run `stackeye login` locally.",
    7,
);
pub const MISSING_CREDENTIAL_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "missing_credential",
    "The browser returned no API key. Complete the authorization page and re-run `stackeye login`.",
    2,
);
pub const INVALID_CREDENTIAL_FORMAT_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "invalid_credential_format",
    "The API key is malformed. Check that --api-url points at a StackEye environment and re-run `stackeye login`.",
    2,
);
pub const HANDSHAKE_TIMEOUT_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "handshake_timeout",
    "Re-run `stackeye login` and finish the browser authorization before the window closes (see --timeout).",
    4,
);
pub const CANCELLED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "cancelled",
    "Re-run `stackeye login` when ready.",
    130,
);
pub const CALLBACK_SERVER_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "callback_server_failed",
    "The local callback server stopped unexpectedly; re-run `stackeye login`.",
    70,
);
pub const VERIFICATION_FAILED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "verification_failed",
    "Nothing was saved. Check network access to the API URL and that the key has not been revoked, then re-run `stackeye login`.",
    5,
);
pub const PERSISTENCE_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "persistence_failed",
    "Browser authentication succeeded but the credential was not saved. Fix write access to the config file and retry the command; no new platform authorization is needed.",
    6,
);
pub const CONFIG_UNREADABLE_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "config_unreadable",
    "Fix or move the config file (see --config / STACKEYE_CONFIG) and re-run the command.",
    6,
);
pub const INVALID_API_URL_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "invalid_api_url",
    "Pass a StackEye API URL such as https://api.stackeye.io via --api-url or STACKEYE_API_URL.",
    2,
);
pub const CONTEXT_NOT_FOUND_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "context_not_found",
    "Check the context name in the config file and try again.",
    2,
);

/// Failures of the login and logout operations.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("already logged in to {api_url} as context `{context}`")]
    AlreadyLoggedIn { context: String, api_url: String },
    #[error("failed to read the existing config: {source}")]
    ConfigUnreadable {
        #[source]
        source: StoreError,
    },
    #[error("cannot derive an authorization URL from `{url}`: {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("failed to bind a loopback callback port: {source}")]
    Bind {
        #[source]
        source: io::Error,
    },
    #[error("callback rejected: request came from non-local address {peer}")]
    NonLocalOrigin { peer: IpAddr },
    #[error("callback did not include an api_key")]
    MissingCredential,
    #[error("received credential is not a well-formed StackEye API key")]
    InvalidCredentialFormat,
    #[error("no login callback received within {timeout_secs} seconds")]
    HandshakeTimeout { timeout_secs: u64 },
    #[error("login cancelled by operator")]
    Cancelled,
    #[error("callback server stopped unexpectedly: {message}")]
    CallbackServer { message: String },
    #[error("credential verification failed: {reason}")]
    VerificationFailed { reason: String },
    #[error("failed to save credentials: {source}")]
    Persistence {
        #[source]
        source: StoreError,
    },
    #[error("context `{name}` does not exist")]
    ContextNotFound { name: String },
}

impl LoginError {
    /// Stage of the login operation that produced this error.
    pub fn stage(&self) -> LoginStage {
        match self {
            LoginError::AlreadyLoggedIn { .. }
            | LoginError::ConfigUnreadable { .. }
            | LoginError::InvalidApiUrl { .. }
            | LoginError::ContextNotFound { .. } => LoginStage::Preflight,
            LoginError::Bind { .. } => LoginStage::Listener,
            LoginError::NonLocalOrigin { .. }
            | LoginError::MissingCredential
            | LoginError::HandshakeTimeout { .. }
            | LoginError::Cancelled
            | LoginError::CallbackServer { .. } => LoginStage::Callback,
            LoginError::InvalidCredentialFormat | LoginError::VerificationFailed { .. } => {
                LoginStage::Verification
            }
            LoginError::Persistence { .. } => LoginStage::Persistence,
        }
    }

    pub fn descriptor(&self) -> &'static ErrorDescriptor {
        match self {
            LoginError::AlreadyLoggedIn { .. } => &ALREADY_LOGGED_IN_ERROR,
            LoginError::ConfigUnreadable { .. } => &CONFIG_UNREADABLE_ERROR,
            LoginError::InvalidApiUrl { .. } => &INVALID_API_URL_ERROR,
            LoginError::Bind { .. } => &BIND_ERROR,
            LoginError::NonLocalOrigin { .. } => &NON_LOCAL_ORIGIN_ERROR,
            LoginError::MissingCredential => &MISSING_CREDENTIAL_ERROR,
            LoginError::InvalidCredentialFormat => &INVALID_CREDENTIAL_FORMAT_ERROR,
            LoginError::HandshakeTimeout { .. } => &HANDSHAKE_TIMEOUT_ERROR,
            LoginError::Cancelled => &CANCELLED_ERROR,
            LoginError::CallbackServer { .. } => &CALLBACK_SERVER_ERROR,
            LoginError::VerificationFailed { .. } => &VERIFICATION_FAILED_ERROR,
            LoginError::Persistence { .. } => &PERSISTENCE_ERROR,
            LoginError::ContextNotFound { .. } => &CONTEXT_NOT_FOUND_ERROR,
        }
    }
}

impl From<StoreError> for LoginError {
    fn from(source: StoreError) -> Self {
        LoginError::Persistence { source }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn every_variant() -> Vec<LoginError> {
        vec![
            LoginError::AlreadyLoggedIn {
                context: "acme-corp".into(),
                api_url: "https://api.stackeye.io".into(),
            },
            LoginError::ConfigUnreadable {
                source: StoreError::DanglingCurrentContext {
                    name: "gone".into(),
                },
            },
            LoginError::InvalidApiUrl {
                url: "nope".into(),
                reason: "relative URL without a base".into(),
            },
            LoginError::Bind {
                source: io::Error::new(io::ErrorKind::AddrInUse, "busy"),
            },
            LoginError::NonLocalOrigin {
                peer: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
            },
            LoginError::MissingCredential,
            LoginError::InvalidCredentialFormat,
            LoginError::HandshakeTimeout { timeout_secs: 300 },
            LoginError::Cancelled,
            LoginError::CallbackServer {
                message: "boom".into(),
            },
            LoginError::VerificationFailed {
                reason: "401".into(),
            },
            LoginError::Persistence {
                source: StoreError::DanglingCurrentContext {
                    name: "gone".into(),
                },
            },
            LoginError::ContextNotFound {
                name: "nope".into(),
            },
        ]
    }

    #[test]
    fn every_error_has_a_remediation_and_nonzero_exit_code() {
        for error in every_variant() {
            let descriptor = error.descriptor();
            assert!(
                !descriptor.remediation.trim().is_empty(),
                "{} must carry a remediation",
                descriptor.code
            );
            assert_ne!(descriptor.exit_code, 0, "{} exit code", descriptor.code);
        }
    }

    #[test]
    fn stages_follow_the_login_pipeline() {
        assert_eq!(
            LoginError::Bind {
                source: io::Error::other("x")
            }
            .stage(),
            LoginStage::Listener
        );
        assert_eq!(
            LoginError::NonLocalOrigin {
                peer: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
            }
            .stage(),
            LoginStage::Callback
        );
        assert_eq!(
            LoginError::InvalidCredentialFormat.stage(),
            LoginStage::Verification
        );
        assert_eq!(
            LoginError::from(StoreError::DanglingCurrentContext { name: "x".into() }).stage(),
            LoginStage::Persistence
        );
    }

    #[test]
    fn persistence_hint_does_not_ask_for_reauthentication() {
        let remediation = PERSISTENCE_ERROR.remediation;
        assert!(remediation.contains("retry"), "{remediation}");
        assert!(remediation.contains("no new platform authorization"));
    }
}
