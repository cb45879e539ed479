//! Outbound credential check against the platform.
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::{lib::errors::LoginError, settings::api::is_loopback_host};

pub const CREDENTIAL_PREFIX: &str = "se_";
pub const CREDENTIAL_BODY_LEN: usize = 64;
pub const VERIFY_PATH: &str = "/v1/auth/verify";
const USER_AGENT: &str = concat!("stackeye-cli/", env!("CARGO_PKG_VERSION"));
const MASK_VISIBLE: usize = 4;

/// Structural check run before any network call.
pub fn validate_credential_format(credential: &str) -> Result<(), LoginError> {
    let body = credential
        .strip_prefix(CREDENTIAL_PREFIX)
        .ok_or(LoginError::InvalidCredentialFormat)?;
    if body.len() != CREDENTIAL_BODY_LEN || !body.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(LoginError::InvalidCredentialFormat);
    }
    Ok(())
}

/// `se_abcd***wxyz`; short or unexpected values collapse to `***`.
pub fn mask_credential(credential: &str) -> String {
    let Some(body) = credential.strip_prefix(CREDENTIAL_PREFIX) else {
        return "***".to_string();
    };
    if body.len() <= MASK_VISIBLE * 2 || !body.is_ascii() {
        return format!("{CREDENTIAL_PREFIX}***");
    }
    format!(
        "{CREDENTIAL_PREFIX}{}***{}",
        &body[..MASK_VISIBLE],
        &body[body.len() - MASK_VISIBLE..]
    )
}

/// Identity returned by the verification endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerifiedIdentity {
    pub organization_id: String,
    pub organization_name: String,
    pub user_email: String,
    pub is_platform_admin: bool,
}

#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl CredentialVerifier {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, LoginError> {
        let parsed = Url::parse(api_url).map_err(|err| LoginError::InvalidApiUrl {
            url: api_url.to_string(),
            reason: err.to_string(),
        })?;
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);
        // Loopback platforms (local development) must not be routed through a proxy.
        if parsed.host().as_ref().is_some_and(is_loopback_host) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|err| LoginError::VerificationFailed {
                reason: format!("failed to create HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{VERIFY_PATH}", api_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validate the format, then ask the platform. Exactly one request, no retries.
    pub async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, LoginError> {
        validate_credential_format(credential)?;
        debug!(
            target: "stackeye::auth",
            endpoint = %self.endpoint,
            credential = %mask_credential(credential),
            "Verifying credential"
        );

        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|err| self.transport_failure(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_failure(err))?;
        if !status.is_success() {
            return Err(LoginError::VerificationFailed {
                reason: rejection_reason(status, &body),
            });
        }

        let identity: VerifiedIdentity =
            serde_json::from_str(&body).map_err(|err| LoginError::VerificationFailed {
                reason: format!("unexpected response from platform: {err}"),
            })?;
        info!(
            target: "stackeye::auth",
            organization_id = %identity.organization_id,
            is_platform_admin = identity.is_platform_admin,
            "Credential verified"
        );
        Ok(identity)
    }

    fn transport_failure(&self, err: reqwest::Error) -> LoginError {
        let reason = if err.is_timeout() {
            format!(
                "platform did not respond within {} seconds",
                self.timeout.as_secs()
            )
        } else if err.is_connect() {
            format!("could not reach {}: {err}", self.endpoint)
        } else {
            err.to_string()
        };
        LoginError::VerificationFailed { reason }
    }
}

fn rejection_reason(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error", "message"].iter().find_map(|key| {
            value
                .get(*key)
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    });
    match detail {
        Some(detail) => format!("platform rejected the credential ({status}): {detail}"),
        None => format!("platform rejected the credential ({status})"),
    }
}
