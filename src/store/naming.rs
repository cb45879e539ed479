//! Context naming and collision-resolving merge.
use tracing::debug;
use url::{Host, Url};

use super::{ConfigStore, Context};

/// Name used when an organization name sanitizes to nothing.
pub const FALLBACK_CONTEXT_NAME: &str = "default";
/// API host of the production environment; contexts for it carry no suffix.
const PRODUCTION_API_HOST: &str = "api.stackeye.io";
const PLATFORM_DOMAIN_SUFFIX: &str = ".stackeye.io";
const API_HOST_PREFIX: &str = "api.";

/// How `merge_context` placed the new context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub name: String,
    pub action: MergeAction,
    /// Number of names probed, starting at 1 for the bare candidate.
    pub attempts: usize,
}

/// Lowercase, replace every non-alphanumeric run with one hyphen, trim hyphens.
///
/// Total: never returns an empty string.
pub fn sanitize_context_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
        } else if !name.is_empty() && !name.ends_with('-') {
            name.push('-');
        }
    }
    while name.ends_with('-') {
        name.pop();
    }

    if name.is_empty() {
        FALLBACK_CONTEXT_NAME.to_string()
    } else {
        name
    }
}

/// Short environment label for non-production API URLs.
///
/// `https://api.stackeye.io` has none; `https://api.dev.stackeye.io` is `dev`;
/// other hosts use their first label, and loopback addresses are `local`.
pub fn environment_label(api_url: &str) -> Option<String> {
    let url = Url::parse(api_url).ok()?;
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if domain == PRODUCTION_API_HOST {
                return None;
            }
            if let Some(env) = domain
                .strip_prefix(API_HOST_PREFIX)
                .and_then(|rest| rest.strip_suffix(PLATFORM_DOMAIN_SUFFIX))
            {
                return Some(env.to_string());
            }
            domain.split('.').next().map(str::to_string)
        }
        Host::Ipv4(ip) if ip.is_loopback() => Some("local".into()),
        Host::Ipv6(ip) if ip.is_loopback() => Some("local".into()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Candidate context name for an organization on a given environment.
pub fn candidate_context_name(organization_name: &str, api_url: &str) -> String {
    match environment_label(api_url) {
        Some(env) => sanitize_context_name(&format!("{organization_name} {env}")),
        None => sanitize_context_name(organization_name),
    }
}

fn suffixed(candidate: &str, attempt: usize) -> String {
    if attempt <= 1 {
        candidate.to_string()
    } else {
        format!("{candidate}-{attempt}")
    }
}

impl ConfigStore {
    /// Store `context` under `candidate` (or the first free `candidate-N`) and make it current.
    ///
    /// A same-named context for the same API URL is updated in place. Probing
    /// stops after `contexts.len() + 1` names, which always includes a free one.
    pub fn merge_context(&mut self, candidate: &str, context: Context) -> MergeOutcome {
        let limit = self.contexts.len() + 1;
        let (attempts, name) = (1..=limit)
            .map(|attempt| (attempt, suffixed(candidate, attempt)))
            .find(|(_, name)| {
                self.contexts
                    .get(name)
                    .map_or(true, |existing| existing.targets(&context.api_url))
            })
            .unwrap_or_else(|| (limit + 1, suffixed(candidate, limit + 1)));

        let action = match self.contexts.get_mut(&name) {
            Some(existing) => {
                existing.api_url = context.api_url;
                existing.organization_id = context.organization_id;
                existing.organization_name = context.organization_name;
                existing.api_key = context.api_key;
                MergeAction::Updated
            }
            None => {
                self.contexts.insert(name.clone(), context);
                MergeAction::Created
            }
        };
        self.current_context = name.clone();

        debug!(
            target: "stackeye::store",
            candidate,
            context = %name,
            attempts,
            action = ?action,
            "Merged login context"
        );

        MergeOutcome {
            name,
            action,
            attempts,
        }
    }
}
