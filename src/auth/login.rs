//! `login` and `logout` as whole operations: precheck, handshake, verify, merge, persist.
use std::{
    path::{Path, PathBuf},
    thread,
};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    browser::BrowserLauncher,
    callback::HandshakeResult,
    coordinator::{HandshakeCoordinator, HandshakeOptions},
    verifier::{mask_credential, CredentialVerifier, VerifiedIdentity},
};
use crate::{
    lib::{
        errors::LoginError,
        telemetry::{emit_login, LoginTelemetry},
    },
    settings::Settings,
    store::{candidate_context_name, ConfigStore, Context, MergeAction},
};

/// Blocking yes/no question asked before replacing a stored credential.
pub type Confirm = fn(&str) -> bool;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub store_path: PathBuf,
    /// Re-authenticate without asking when a context already holds a credential.
    pub assume_yes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReport {
    pub context_name: String,
    pub action: MergeAction,
    pub api_url: String,
    pub organization_id: String,
    pub organization_name: String,
    pub user_email: String,
    pub store_path: PathBuf,
}

impl LoginReport {
    pub fn summary(&self) -> String {
        let organization = match (self.organization_name.is_empty(), self.organization_id.is_empty()) {
            (false, false) => format!("{} ({})", self.organization_name, self.organization_id),
            (false, true) => self.organization_name.clone(),
            (true, false) => self.organization_id.clone(),
            (true, true) => "your organization".to_string(),
        };
        let who = if self.user_email.is_empty() {
            String::new()
        } else {
            format!(" as {}", self.user_email)
        };
        let verb = match self.action {
            MergeAction::Created => "Created",
            MergeAction::Updated => "Updated",
        };
        format!(
            "Logged in to {organization}{who}.\n{verb} context `{}` for {} and set it as current.\nConfig: {}",
            self.context_name,
            self.api_url,
            self.store_path.display()
        )
    }
}

/// Run one login attempt end to end.
///
/// `confirm` is asked only when a credential for the target API already exists
/// and neither `assume_yes` nor non-interactive mode decides the answer.
pub async fn login(
    settings: &Settings,
    request: &LoginRequest,
    launcher: &dyn BrowserLauncher,
    confirm: Confirm,
    cancel: &CancellationToken,
) -> Result<LoginReport, LoginError> {
    let api_url = settings.api.url.as_str();
    let existing = ConfigStore::load(&request.store_path)
        .map_err(|source| LoginError::ConfigUnreadable { source })?;

    if let Some((name, _)) = existing.authenticated_for(api_url) {
        let proceed = if request.assume_yes {
            true
        } else if settings.login.non_interactive {
            false
        } else {
            let question =
                format!("Context `{name}` is already logged in to {api_url}. Log in again?");
            ask(confirm, question, cancel).await?
        };
        if !proceed {
            return Err(LoginError::AlreadyLoggedIn {
                context: name.to_string(),
                api_url: api_url.to_string(),
            });
        }
        info!(
            target: "stackeye::auth",
            context = name,
            "Re-authenticating existing context"
        );
    }

    if cancel.is_cancelled() {
        return Err(LoginError::Cancelled);
    }

    // Build the client before the browser round trip so a bad URL fails early.
    let verifier = CredentialVerifier::new(api_url, settings.login.verify_timeout)?;
    let mut coordinator =
        HandshakeCoordinator::new(HandshakeOptions::from_settings(settings), launcher);
    let handshake = coordinator.run(cancel).await?;

    let identity = verifier.verify(&handshake.credential).await?;
    let context = resolve_context(api_url, &handshake, &identity);

    // Reload so edits made while the browser was open are not lost.
    let mut store = ConfigStore::load(&request.store_path)?;
    let candidate = candidate_context_name(&context.organization_name, api_url);
    let organization_id = context.organization_id.clone();
    let organization_name = context.organization_name.clone();
    let outcome = store.merge_context(&candidate, context);
    store.save(&request.store_path)?;

    let masked = mask_credential(&handshake.credential);
    emit_login(&LoginTelemetry {
        context_name: &outcome.name,
        api_url,
        organization_id: &organization_id,
        created: outcome.action == MergeAction::Created,
        masked_credential: &masked,
    });

    Ok(LoginReport {
        context_name: outcome.name,
        action: outcome.action,
        api_url: api_url.to_string(),
        organization_id,
        organization_name,
        user_email: identity.user_email,
        store_path: request.store_path.clone(),
    })
}

/// Ask on a detached thread so Ctrl-C ends the wait even while the read is still blocked.
async fn ask(
    confirm: Confirm,
    question: String,
    cancel: &CancellationToken,
) -> Result<bool, LoginError> {
    let (answer_tx, answer_rx) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name("stackeye-confirm".into())
        .spawn(move || {
            let _ = answer_tx.send(confirm(&question));
        });
    if let Err(err) = spawned {
        warn!(
            target: "stackeye::auth",
            error = %err,
            "Could not start confirmation prompt; treating it as declined"
        );
        return Ok(false);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LoginError::Cancelled),
        answer = answer_rx => Ok(answer.unwrap_or(false)),
    }
}

/// Verified identity wins; callback hints fill whatever the platform left empty.
fn resolve_context(api_url: &str, handshake: &HandshakeResult, identity: &VerifiedIdentity) -> Context {
    let prefer = |verified: &str, hinted: &str| {
        if verified.trim().is_empty() {
            hinted.trim().to_string()
        } else {
            verified.trim().to_string()
        }
    };
    Context {
        api_url: api_url.to_string(),
        organization_id: prefer(&identity.organization_id, &handshake.org_id),
        organization_name: prefer(&identity.organization_name, &handshake.org_name),
        api_key: handshake.credential.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutReport {
    LoggedOut { context: String },
    AlreadyLoggedOut { context: String },
    NoCurrentContext,
}

impl LogoutReport {
    pub fn summary(&self) -> String {
        match self {
            LogoutReport::LoggedOut { context } => {
                format!("Logged out of context `{context}`. Its other settings were kept.")
            }
            LogoutReport::AlreadyLoggedOut { context } => {
                format!("Context `{context}` is not logged in; nothing to do.")
            }
            LogoutReport::NoCurrentContext => "No current context; nothing to do.".to_string(),
        }
    }
}

/// Clear the credential of `context`, or of the current context when `None`.
pub fn logout(store_path: &Path, context: Option<&str>) -> Result<LogoutReport, LoginError> {
    let mut store =
        ConfigStore::load(store_path).map_err(|source| LoginError::ConfigUnreadable { source })?;
    let name = match context {
        Some(name) => name.to_string(),
        None if store.current_context.is_empty() => return Ok(LogoutReport::NoCurrentContext),
        None => store.current_context.clone(),
    };

    match store.clear_credential(&name) {
        None => Err(LoginError::ContextNotFound { name }),
        Some(false) => Ok(LogoutReport::AlreadyLoggedOut { context: name }),
        Some(true) => {
            store.save(store_path)?;
            info!(target: "stackeye::store", context = %name, "Cleared stored credential");
            Ok(LogoutReport::LoggedOut { context: name })
        }
    }
}
