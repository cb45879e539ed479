//! Drives one browser handshake from listener bind to server teardown.
use std::{io, net::SocketAddr, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    browser::BrowserLauncher,
    callback::{self, CallbackOutcome, CallbackPublisher, HandshakeResult},
    listener::LoopbackListener,
    target::AuthorizationTarget,
};
use crate::{
    lib::{errors::LoginError, telemetry::HandshakeSpan},
    settings::Settings,
};

/// Parameters fixed at construction; nothing is read from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOptions {
    pub api_url: String,
    pub timeout: Duration,
    pub shutdown_grace: Duration,
}

impl HandshakeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_url: settings.api.url.clone(),
            timeout: settings.login.timeout,
            shutdown_grace: settings.login.shutdown_grace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    ListenerStarted,
    BrowserLaunched,
    WaitingForCallback,
    Succeeded,
    TimedOut,
    Failed,
    ServerStopped,
}

impl HandshakeState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HandshakeState::Idle => "idle",
            HandshakeState::ListenerStarted => "listener_started",
            HandshakeState::BrowserLaunched => "browser_launched",
            HandshakeState::WaitingForCallback => "waiting_for_callback",
            HandshakeState::Succeeded => "succeeded",
            HandshakeState::TimedOut => "timed_out",
            HandshakeState::Failed => "failed",
            HandshakeState::ServerStopped => "server_stopped",
        }
    }
}

pub struct HandshakeCoordinator<'a> {
    options: HandshakeOptions,
    launcher: &'a dyn BrowserLauncher,
    state: HandshakeState,
    history: Vec<HandshakeState>,
    span: HandshakeSpan,
}

impl<'a> HandshakeCoordinator<'a> {
    pub fn new(options: HandshakeOptions, launcher: &'a dyn BrowserLauncher) -> Self {
        let span = HandshakeSpan::start(&options.api_url);
        Self {
            options,
            launcher,
            state: HandshakeState::Idle,
            history: vec![HandshakeState::Idle],
            span,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[HandshakeState] {
        &self.history
    }

    /// Run the handshake. The callback server is stopped before this returns, on every path.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<HandshakeResult, LoginError> {
        let listener = match LoopbackListener::bind().await {
            Ok(listener) => listener,
            Err(err) => return Err(self.fail_before_server(err)),
        };
        let target = match AuthorizationTarget::derive(&self.options.api_url, listener.port()) {
            Ok(target) => target,
            Err(err) => return Err(self.fail_before_server(err)),
        };

        let (publisher, receiver) = CallbackPublisher::channel();
        let server = CallbackServer::start(listener, publisher);
        self.transition(HandshakeState::ListenerStarted);

        let authorization_url = target.authorization_url();
        eprintln!("Opening your browser to log in to StackEye.");
        eprintln!("If it does not open, visit this URL:\n\n    {authorization_url}\n");
        if let Err(err) = self.launcher.open(&authorization_url) {
            warn!(
                target: "stackeye::auth",
                launcher = self.launcher.name(),
                error = %err,
                "Failed to open browser; continuing with manual URL"
            );
        }
        self.transition(HandshakeState::BrowserLaunched);

        eprintln!("Waiting for authorization in the browser...");
        self.settle(server, receiver, cancel).await
    }

    /// Wait on a started server, record the terminal state and stop the server.
    async fn settle(
        &mut self,
        mut server: CallbackServer,
        receiver: oneshot::Receiver<CallbackOutcome>,
        cancel: &CancellationToken,
    ) -> Result<HandshakeResult, LoginError> {
        self.transition(HandshakeState::WaitingForCallback);
        let outcome = server
            .wait_for(receiver, self.options.timeout, cancel)
            .await;

        let terminal = match &outcome {
            Ok(_) => HandshakeState::Succeeded,
            Err(LoginError::HandshakeTimeout { .. }) => HandshakeState::TimedOut,
            Err(_) => HandshakeState::Failed,
        };
        self.transition(terminal);

        server.shutdown(self.options.shutdown_grace).await;
        self.transition(HandshakeState::ServerStopped);
        self.span.finish(terminal.as_str());
        outcome
    }

    fn fail_before_server(&mut self, err: LoginError) -> LoginError {
        self.transition(HandshakeState::Failed);
        self.span.finish(HandshakeState::Failed.as_str());
        err
    }

    fn transition(&mut self, next: HandshakeState) {
        self.span.transition(self.state.as_str(), next.as_str());
        self.state = next;
        self.history.push(next);
    }
}

/// Background axum server bound to the loopback listener.
pub struct CallbackServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl CallbackServer {
    pub fn start(listener: LoopbackListener, publisher: CallbackPublisher) -> Self {
        let addr = listener.local_addr();
        let shutdown = CancellationToken::new();
        let app = callback::router(publisher);
        let signal = shutdown.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            axum::serve(
                listener.into_inner(),
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(signal)
            .await
        });
        Self {
            addr,
            shutdown,
            task: Some(task),
        }
    }

    /// Wait for the first published outcome, the deadline, cancellation or a server crash.
    pub async fn wait_for(
        &mut self,
        receiver: oneshot::Receiver<CallbackOutcome>,
        window: Duration,
        cancel: &CancellationToken,
    ) -> CallbackOutcome {
        let deadline = Instant::now() + window;
        let mut server_exited = false;
        let outcome = tokio::select! {
            biased;
            received = receiver => match received {
                Ok(outcome) => outcome,
                Err(_) => Err(LoginError::CallbackServer {
                    message: "callback channel closed without a result".into(),
                }),
            },
            _ = cancel.cancelled() => Err(LoginError::Cancelled),
            _ = time::sleep_until(deadline) => Err(LoginError::HandshakeTimeout {
                timeout_secs: whole_seconds(window),
            }),
            exit = Self::server_exit(&mut self.task) => {
                server_exited = true;
                Err(LoginError::CallbackServer { message: exit })
            }
        };
        if server_exited {
            self.task = None;
        }
        outcome
    }

    async fn server_exit(task: &mut Option<JoinHandle<io::Result<()>>>) -> String {
        match task.as_mut() {
            Some(handle) => match handle.await {
                Ok(Ok(())) => "server exited before a callback arrived".to_string(),
                Ok(Err(err)) => err.to_string(),
                Err(err) => err.to_string(),
            },
            None => std::future::pending().await,
        }
    }

    /// Stop serving and wait for the task; aborts it once `grace` runs out. Safe to call twice.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.shutdown.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };
        match time::timeout(grace, &mut task).await {
            Ok(Ok(Ok(()))) => debug!(target: "stackeye::auth", addr = %self.addr, "Callback server stopped"),
            Ok(Ok(Err(err))) => warn!(
                target: "stackeye::auth",
                error = %err,
                "Callback server exited with an error"
            ),
            Ok(Err(err)) => warn!(
                target: "stackeye::auth",
                error = %err,
                "Callback server task failed"
            ),
            Err(_) => {
                warn!(
                    target: "stackeye::auth",
                    grace_secs = grace.as_secs(),
                    "Callback server did not drain in time; aborting"
                );
                task.abort();
                let _ = task.await;
            }
        }
    }
}

/// Seconds rounded up, so a sub-second window never reads as zero.
fn whole_seconds(window: Duration) -> u64 {
    window.as_secs() + u64::from(window.subsec_nanos() > 0)
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
