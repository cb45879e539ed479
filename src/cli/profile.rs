//! InvocationProfile and store-path/log-level resolution.
use std::{env, ffi::OsString, path::PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::{lib::paths::resolve_default_store_path, settings::SettingsOverrides};

const STACKEYE_CONFIG_ENV: &str = "STACKEYE_CONFIG";

/// Resolved per-invocation inputs.
#[derive(Debug, Clone)]
pub struct InvocationProfile {
    pub store_path: PathBuf,
    pub overrides: SettingsOverrides,
    pub log_directive: &'static str,
}

/// Resolve the store path in the order: CLI override → `STACKEYE_CONFIG` → per-user default.
pub fn resolve_store_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    resolve_store_path_with(override_path, env::var_os(STACKEYE_CONFIG_ENV))
}

fn resolve_store_path_with(
    override_path: Option<PathBuf>,
    env_value: Option<OsString>,
) -> Result<PathBuf> {
    let path = match override_path.or_else(|| {
        env_value
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }) {
        Some(path) => path,
        None => return resolve_default_store_path().map_err(|message| anyhow!(message)),
    };

    if path.is_absolute() {
        return Ok(path);
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(cwd.join(path))
}

/// `RUST_LOG`-style default directive for `-v` count.
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
