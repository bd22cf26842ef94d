//! OAuth authorize URL construction for the re-authentication flow.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::error::SessionError;
use crate::types::SessionToken;

/// Identity provider settings used to build the redirect URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthRedirectConfig {
    /// Provider authorize endpoint (e.g. `https://github.com/login/oauth/authorize`)
    pub authorize_url: String,
    /// OAuth client ID registered with the provider
    pub client_id: String,
    /// Callback the provider redirects back to after consent
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Space-separated scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl Default for OAuthRedirectConfig {
    fn default() -> Self {
        Self {
            authorize_url: std::env::var("OAUTH2_AUTHORIZE_URL")
                .unwrap_or_else(|_| "http://localhost/oauth/authorize".to_string()),
            client_id: std::env::var("OAUTH2_CLIENT_ID").unwrap_or_default(),
            callback_url: std::env::var("OAUTH2_CALLBACK_URL").ok(),
            scope: std::env::var("OAUTH2_SCOPE").ok(),
        }
    }
}

/// Builds provider authorize URLs carrying the session token as `state`.
#[derive(Debug, Clone)]
pub struct OAuthRedirect {
    config: OAuthRedirectConfig,
}

impl OAuthRedirect {
    pub fn new(config: OAuthRedirectConfig) -> Self {
        Self { config }
    }

    /// Authorize URL for `token`.
    pub fn url_for(&self, token: &SessionToken) -> Result<String, SessionError> {
        let mut url = Url::parse(&self.config.authorize_url).map_err(|e| {
            SessionError::Backend(format!(
                "invalid authorize url {}: {}",
                self.config.authorize_url, e
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id);
            if let Some(callback) = &self.config.callback_url {
                query.append_pair("redirect_uri", callback);
            }
            if let Some(scope) = &self.config.scope {
                query.append_pair("scope", scope);
            }
            query.append_pair("state", token.as_str());
        }

        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthRedirectConfig {
        OAuthRedirectConfig {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            client_id: "client-1".to_string(),
            callback_url: Some("https://registry.local/oauth/callback".to_string()),
            scope: Some("read:user user:email".to_string()),
        }
    }

    #[test]
    fn test_url_carries_state_and_client() {
        let redirect = OAuthRedirect::new(config());
        let url = redirect.url_for(&SessionToken::new("tok-42")).unwrap();

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("state".to_string(), "tok-42".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-1".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "read:user user:email".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://registry.local/oauth/callback".to_string()
        )));
    }

    #[test]
    fn test_optional_params_omitted() {
        let redirect = OAuthRedirect::new(OAuthRedirectConfig {
            callback_url: None,
            scope: None,
            ..config()
        });
        let url = redirect.url_for(&SessionToken::new("t")).unwrap();
        assert!(!url.contains("redirect_uri"));
        assert!(!url.contains("scope"));
    }

    #[test]
    fn test_invalid_authorize_url() {
        let redirect = OAuthRedirect::new(OAuthRedirectConfig {
            authorize_url: "not a url".to_string(),
            ..config()
        });
        let err = redirect.url_for(&SessionToken::new("t")).unwrap_err();
        assert!(matches!(err, SessionError::Backend(_)));
    }
}
