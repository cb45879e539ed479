//! Per-user path resolution for the persisted context store.

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Environment variable name for the XDG config root.
const XDG_CONFIG_HOME_ENV: &str = "XDG_CONFIG_HOME";
/// Environment variable name for user home directory.
const HOME_ENV: &str = "HOME";
/// Directory created under the config root.
const APP_DIR: &str = "stackeye";
/// File name of the context store.
pub const STORE_FILE_NAME: &str = "config.toml";

/// Returns true if the path is non-empty and absolute.
pub fn is_nonempty_absolute(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_absolute()
}

/// Resolve the default context store path.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/stackeye/config.toml` when set to an absolute path.
/// 2. `$HOME/.config/stackeye/config.toml` otherwise.
pub fn resolve_default_store_path() -> Result<PathBuf, &'static str> {
    resolve_store_path_from(env::var_os(XDG_CONFIG_HOME_ENV), env::var_os(HOME_ENV))
}

fn resolve_store_path_from(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Result<PathBuf, &'static str> {
    if let Some(root) = xdg_config_home
        .map(PathBuf::from)
        .filter(|path| is_nonempty_absolute(path))
    {
        return Ok(root.join(APP_DIR).join(STORE_FILE_NAME));
    }

    if let Some(home) = home.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(STORE_FILE_NAME));
    }

    Err("XDG_CONFIG_HOME and HOME are both unset")
}
