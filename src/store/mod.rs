//! Persisted multi-context credential store.
//!
//! The on-disk format is shared with every other `stackeye` command:
//!
//! ```toml
//! current_context = "acme-corp"
//!
//! [contexts.acme-corp]
//! api_url = "https://api.stackeye.io"
//! organization_id = "org_123"
//! organization_name = "Acme Corp"
//! api_key = "se_..."
//! ```
use std::{collections::BTreeMap, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    lib::{errors::StoreError, fs::write_owner_only_atomic},
    settings::normalize_api_url,
};

pub mod naming;

pub use naming::{
    candidate_context_name, environment_label, sanitize_context_name, MergeAction, MergeOutcome,
    FALLBACK_CONTEXT_NAME,
};

/// One named, independently authenticated profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub api_key: String,
}

impl Context {
    pub fn is_authenticated(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Whether this context points at `api_url`, ignoring trailing slashes.
    pub fn targets(&self, api_url: &str) -> bool {
        normalize_api_url(&self.api_url) == normalize_api_url(api_url)
    }
}

/// All stored contexts plus the name of the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
}

impl ConfigStore {
    /// Load the store; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    target: "stackeye::store",
                    path = %path.display(),
                    "Config file not found; starting with an empty store"
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist the store atomically with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        let text = toml::to_string_pretty(self).map_err(|source| StoreError::Serialize { source })?;
        write_owner_only_atomic(path, text.as_bytes()).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            target: "stackeye::store",
            path = %path.display(),
            contexts = self.contexts.len(),
            current = %self.current_context,
            "Config file saved"
        );
        Ok(())
    }

    /// `current_context`, when set, must name a stored context.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.current_context.is_empty() || self.contexts.contains_key(&self.current_context) {
            return Ok(());
        }
        Err(StoreError::DanglingCurrentContext {
            name: self.current_context.clone(),
        })
    }

    pub fn current(&self) -> Option<(&str, &Context)> {
        self.contexts
            .get_key_value(&self.current_context)
            .map(|(name, context)| (name.as_str(), context))
    }

    /// Find a context for `api_url` that still holds a credential, preferring the current one.
    pub fn authenticated_for(&self, api_url: &str) -> Option<(&str, &Context)> {
        let matches = |context: &Context| context.targets(api_url) && context.is_authenticated();

        if let Some((name, context)) = self.current().filter(|(_, context)| matches(context)) {
            return Some((name, context));
        }
        self.contexts
            .iter()
            .find(|(_, context)| matches(context))
            .map(|(name, context)| (name.as_str(), context))
    }

    /// Empty the credential of `name`, keeping its other fields.
    ///
    /// Returns `None` when the context does not exist, otherwise whether a credential was cleared.
    pub fn clear_credential(&mut self, name: &str) -> Option<bool> {
        let context = self.contexts.get_mut(name)?;
        let had_credential = context.is_authenticated();
        context.api_key.clear();
        Some(had_credential)
    }
}
