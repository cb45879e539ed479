//! Local HTTP callback that terminates the browser handshake.
//!
//! Only loopback peers are served. The first accepted or rejected request
//! publishes the outcome; later loopback requests get `409 Conflict`.
use std::{
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex, PoisonError},
};

use axum::{
    extract::{ConnectInfo, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::lib::errors::LoginError;

pub const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>StackEye CLI</title></head>
<body>
    <h1>Login complete</h1>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

const MISSING_CREDENTIAL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>StackEye CLI - Error</title></head>
<body>
    <h1>Login failed</h1>
    <p>No API key was received. Check the terminal and run <code>stackeye login</code> again.</p>
</body>
</html>"#;

const FORBIDDEN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>StackEye CLI - Forbidden</title></head>
<body><h1>Forbidden</h1></body>
</html>"#;

const ALREADY_COMPLETED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>StackEye CLI</title></head>
<body>
    <h1>Login already completed</h1>
    <p>This login request was already handled. Check the terminal.</p>
</body>
</html>"#;

/// Credential and organization hints delivered by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResult {
    pub credential: String,
    pub org_id: String,
    pub org_name: String,
}

pub type CallbackOutcome = Result<HandshakeResult, LoginError>;

/// Single-slot publisher shared by all requests of one handshake.
#[derive(Debug, Clone)]
pub struct CallbackPublisher {
    slot: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

impl CallbackPublisher {
    /// Create the publisher and the receiving end the coordinator waits on.
    pub fn channel() -> (Self, oneshot::Receiver<CallbackOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Publish `outcome` if nothing was published yet. Never blocks.
    ///
    /// Returns `false` when an earlier request already used the slot.
    pub fn publish(&self, outcome: CallbackOutcome) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                // The coordinator may have stopped waiting; the slot is spent either way.
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Router serving the callback path; mount with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(publisher: CallbackPublisher) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .with_state(publisher)
}

async fn handle_callback(
    State(publisher): State<CallbackPublisher>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    RawQuery(query): RawQuery,
) -> Response {
    respond(peer.ip(), query.as_deref(), &publisher).into_response()
}

/// Decide the response for one callback request and publish its outcome.
pub fn respond(
    peer: IpAddr,
    raw_query: Option<&str>,
    publisher: &CallbackPublisher,
) -> (StatusCode, Html<&'static str>) {
    let outcome = evaluate_callback(peer, raw_query);
    let (status, page) = match &outcome {
        Ok(_) => (StatusCode::OK, SUCCESS_PAGE),
        Err(LoginError::NonLocalOrigin { .. }) => (StatusCode::FORBIDDEN, FORBIDDEN_PAGE),
        Err(_) => (StatusCode::BAD_REQUEST, MISSING_CREDENTIAL_PAGE),
    };

    if status == StatusCode::FORBIDDEN {
        warn!(
            target: "stackeye::auth",
            peer = %peer,
            "Rejected login callback from non-loopback address"
        );
        publisher.publish(outcome);
        return (status, Html(page));
    }

    if !publisher.publish(outcome) {
        info!(
            target: "stackeye::auth",
            "Ignored duplicate login callback"
        );
        return (StatusCode::CONFLICT, Html(ALREADY_COMPLETED_PAGE));
    }

    info!(
        target: "stackeye::auth",
        status = status.as_u16(),
        "Handled login callback"
    );
    (status, Html(page))
}

/// Validate one callback request. The origin check runs before anything else.
pub fn evaluate_callback(peer: IpAddr, raw_query: Option<&str>) -> CallbackOutcome {
    if !is_loopback_peer(peer) {
        return Err(LoginError::NonLocalOrigin { peer });
    }

    let mut result = HandshakeResult::default();
    for (key, value) in url::form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "api_key" => result.credential = value.trim().to_string(),
            "org_id" => result.org_id = value.trim().to_string(),
            "org_name" => result.org_name = value.trim().to_string(),
            _ => {}
        }
    }

    if result.credential.is_empty() {
        return Err(LoginError::MissingCredential);
    }
    Ok(result)
}

/// `127.0.0.0/8` or `::1`, including IPv4-mapped IPv6 forms.
pub fn is_loopback_peer(peer: IpAddr) -> bool {
    peer.to_canonical().is_loopback()
}
