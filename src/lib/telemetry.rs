//! Telemetry initialization and handshake span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialize `tracing` and format operator-facing diagnostics on stderr.
///
/// `RUST_LOG` wins over `default_directive` when set.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper recording the lifecycle of one login handshake.
pub struct HandshakeSpan {
    span: Span,
    started_at: Instant,
    handshake_id: Uuid,
}

impl HandshakeSpan {
    /// Start a handshake span with a fresh id.
    pub fn start(api_url: &str) -> Self {
        let handshake_id = Uuid::new_v4();
        let span = info_span!(
            target: "stackeye::auth",
            "login_handshake",
            %handshake_id,
            api_url
        );
        Self {
            span,
            started_at: Instant::now(),
            handshake_id,
        }
    }

    /// Record a coordinator state transition.
    pub fn transition(&self, from: &'static str, to: &'static str) {
        let _entered = self.span.enter();
        debug!(
            target: "stackeye::auth",
            handshake_id = %self.handshake_id,
            from,
            to,
            "Handshake state changed"
        );
    }

    /// Close the span while recording the outcome.
    pub fn finish(&self, outcome: &'static str) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "stackeye::auth",
            handshake_id = %self.handshake_id,
            outcome,
            elapsed_ms = elapsed_ms,
            "Completed login handshake"
        );
    }
}

/// Payload describing a finished login, logged as structured telemetry.
#[derive(Debug, Serialize)]
pub struct LoginTelemetry<'a> {
    pub context_name: &'a str,
    pub api_url: &'a str,
    pub organization_id: &'a str,
    pub created: bool,
    pub masked_credential: &'a str,
}

/// Emit the login result to `tracing`.
pub fn emit_login(telemetry: &LoginTelemetry<'_>) {
    info!(
        target: "stackeye::store",
        context = telemetry.context_name,
        api_url = telemetry.api_url,
        organization_id = telemetry.organization_id,
        created = telemetry.created,
        credential = telemetry.masked_credential,
        "Stored login context"
    );
}
