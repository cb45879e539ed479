use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context as _, Result};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use stackeye::{
    auth::BrowserLauncher,
    settings::{ApiSettings, LoginSettings, Settings},
    store::{ConfigStore, Context},
};
use tokio::{net::TcpListener, task::JoinHandle};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_stackeye");

/// Well-formed key the mock platform accepts.
pub fn valid_key() -> String {
    format!("se_{}", "k1".repeat(32))
}

/// Well-formed key the mock platform rejects.
pub fn revoked_key() -> String {
    format!("se_{}", "r9".repeat(32))
}

#[derive(Clone)]
struct PlatformState {
    accepted_key: String,
    verify_calls: Arc<AtomicUsize>,
}

/// Minimal stand-in for the platform's verification endpoint.
pub struct MockPlatform {
    pub api_url: String,
    verify_calls: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockPlatform {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .context("failed to bind mock platform")?;
        let addr: SocketAddr = listener.local_addr()?;
        let verify_calls = Arc::new(AtomicUsize::new(0));
        let state = PlatformState {
            accepted_key: valid_key(),
            verify_calls: verify_calls.clone(),
        };
        let app = Router::new()
            .route("/v1/auth/verify", get(verify))
            .with_state(state);
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            api_url: format!("http://{addr}"),
            verify_calls,
            task,
        })
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockPlatform {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn verify(State(state): State<PlatformState>, headers: HeaderMap) -> Response {
    state.verify_calls.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", state.accepted_key);
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid api key" })),
        )
            .into_response();
    }
    Json(json!({
        "organization_id": "org_acme",
        "organization_name": "Acme Corp",
        "user_email": "ops@acme.test",
        "is_platform_admin": false
    }))
    .into_response()
}

/// Plays the browser: follows the authorization URL straight to the callback.
pub struct CallbackLauncher {
    query: Option<String>,
}

impl CallbackLauncher {
    pub fn delivering(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }

    /// Opens nothing, so the handshake can only time out or be cancelled.
    pub fn silent() -> Self {
        Self { query: None }
    }
}

impl BrowserLauncher for CallbackLauncher {
    fn name(&self) -> &'static str {
        "test-callback"
    }

    fn open(&self, url: &str) -> io::Result<()> {
        let Some(query) = self.query.clone() else {
            return Ok(());
        };
        let parsed = url::Url::parse(url).map_err(io::Error::other)?;
        let callback = parsed
            .query_pairs()
            .find(|(key, _)| key == "callback")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| io::Error::other("authorization URL has no callback"))?;
        tokio::spawn(async move {
            let client = reqwest::Client::builder()
                .no_proxy()
                .build()
                .expect("client");
            let _ = client.get(format!("{callback}?{query}")).send().await;
        });
        Ok(())
    }
}

pub fn settings_for(api_url: &str, timeout: Duration) -> Settings {
    Settings {
        api: ApiSettings {
            url: api_url.to_string(),
        },
        login: LoginSettings {
            timeout,
            verify_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(2),
            non_interactive: true,
        },
    }
}

pub fn seed_store(path: &Path, entries: &[(&str, &str, &str)]) {
    let mut store = ConfigStore::default();
    for (name, api_url, key) in entries {
        store.contexts.insert(
            (*name).to_string(),
            Context {
                api_url: (*api_url).to_string(),
                organization_id: "org_seed".into(),
                organization_name: "Seed Org".into(),
                api_key: (*key).to_string(),
            },
        );
    }
    if let Some((name, _, _)) = entries.first() {
        store.current_context = (*name).to_string();
    }
    store.save(path).expect("seed store");
}
