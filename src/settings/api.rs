use serde::Deserialize;
use url::{Host, Url};

use crate::lib::errors::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.stackeye.io";

/// Platform endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Normalized API base URL without a trailing slash.
    pub url: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawApiSettings {
    pub api_url: Option<String>,
}

pub fn parse_api_settings(raw: RawApiSettings) -> Result<ApiSettings, ConfigError> {
    let value = raw
        .api_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let url = Url::parse(&value).map_err(|err| invalid(format!("`{value}` is not a URL: {err}")))?;
    let host = url
        .host()
        .ok_or_else(|| invalid(format!("`{value}` has no host")))?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback_host(&host) => {}
        "http" => return Err(invalid("plain http is only accepted for loopback hosts".into())),
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials must not be embedded in the URL".into()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".into()));
    }

    Ok(ApiSettings {
        url: normalize_api_url(url.as_str()),
    })
}

/// Strip trailing slashes so stored URLs compare equal regardless of input form.
pub fn normalize_api_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

pub(crate) fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback(),
        Host::Ipv6(ip) => ip.is_loopback(),
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidField {
        field: "api_url",
        message,
    }
}
