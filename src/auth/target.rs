use url::{Host, Url};

use super::callback::CALLBACK_PATH;
use crate::lib::errors::LoginError;

/// Path on the web UI that starts the CLI authorization.
pub const AUTHORIZE_PATH: &str = "/cli-auth";
/// Query parameter carrying the callback URL.
pub const CALLBACK_QUERY_PARAM: &str = "callback";
const API_HOST_PREFIX: &str = "api.";
const WEB_HOST_PREFIX: &str = "app.";

/// Where the browser is sent and where it reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationTarget {
    /// Web UI origin, e.g. `https://app.stackeye.io`.
    pub base_url: String,
    /// Loopback callback, e.g. `http://127.0.0.1:49152/callback`.
    pub callback_url: String,
}

impl AuthorizationTarget {
    /// Derive the target from the API URL and the bound callback port.
    pub fn derive(api_url: &str, port: u16) -> Result<Self, LoginError> {
        let invalid = |reason: String| LoginError::InvalidApiUrl {
            url: api_url.to_string(),
            reason,
        };

        let mut web = Url::parse(api_url).map_err(|err| invalid(err.to_string()))?;
        let web_host = match web.host() {
            Some(Host::Domain(domain)) => match domain.strip_prefix(API_HOST_PREFIX) {
                Some(rest) => Some(format!("{WEB_HOST_PREFIX}{rest}")),
                None => None,
            },
            Some(_) => None,
            None => return Err(invalid("URL has no host".into())),
        };
        if let Some(host) = web_host {
            web.set_host(Some(&host))
                .map_err(|err| invalid(err.to_string()))?;
        }
        web.set_path("");
        web.set_query(None);
        web.set_fragment(None);

        Ok(Self {
            base_url: web.as_str().trim_end_matches('/').to_string(),
            callback_url: format!("http://127.0.0.1:{port}{CALLBACK_PATH}"),
        })
    }

    /// Full URL the operator's browser opens.
    pub fn authorization_url(&self) -> String {
        let mut url = format!("{}{AUTHORIZE_PATH}?", self.base_url);
        url.push_str(
            &url::form_urlencoded::Serializer::new(String::new())
                .append_pair(CALLBACK_QUERY_PARAM, &self.callback_url)
                .finish(),
        );
        url
    }
}
