//! User record resolved from a session.

use serde::{Deserialize, Serialize};

use crate::types::{AccessToken, Email};

/// A user as recorded by the session store.
///
/// Serialized with the camelCase field names the session store writes
/// (`accessToken`, `cacheAllowed`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity used for the whitelist gate
    pub email: Email,
    /// Upstream access token; absent until the OAuth handshake completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
    /// Whether downstream layers may cache this authorization result
    #[serde(default = "default_cache_allowed")]
    pub cache_allowed: bool,
}

fn default_cache_allowed() -> bool {
    true
}

impl User {
    /// Create a user without an access token.
    pub fn new(email: impl Into<Email>) -> Self {
        Self {
            email: email.into(),
            access_token: None,
            cache_allowed: true,
        }
    }

    /// Attach an upstream access token.
    pub fn with_access_token(mut self, token: impl Into<AccessToken>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// The access token, treating an empty string the same as a missing one.
    pub fn live_access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref().filter(|t| !t.is_empty())
    }
}
