use tracing::{debug, info};

use super::{Settings, ENV_PREFIX};

pub fn log_overrides(flag_count: usize) {
    if flag_count > 0 {
        info!(
            target: "stackeye::settings",
            overrides = flag_count,
            "Applying command-line setting overrides"
        );
    } else {
        debug!(
            target: "stackeye::settings",
            env_prefix = ENV_PREFIX,
            "No command-line overrides; using defaults and environment"
        );
    }
}

pub fn log_loaded(settings: &Settings) {
    debug!(
        target: "stackeye::settings",
        api_url = %settings.api.url,
        login_timeout_secs = settings.login.timeout.as_secs(),
        verify_timeout_secs = settings.login.verify_timeout.as_secs(),
        shutdown_grace_secs = settings.login.shutdown_grace.as_secs(),
        non_interactive = settings.login.non_interactive,
        "Settings loaded"
    );
}
