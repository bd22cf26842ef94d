//! Incoming request credentials and bearer token extraction.

use std::collections::HashMap;

use crate::types::SessionToken;

/// Literal scheme prefix expected in the `authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Auth material carried by an incoming registry request.
///
/// Header names are stored lower-cased so lookups are case-insensitive on the
/// name. Values are kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    headers: HashMap<String, String>,
}

impl Credentials {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a header set holding only an `authorization` value.
    pub fn with_authorization(value: impl Into<String>) -> Self {
        Self::new().with_header("authorization", value)
    }

    /// Add a header, replacing any previous value under the same name.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The raw `authorization` header, if present.
    pub fn authorization(&self) -> Option<&str> {
        self.header("authorization")
    }

    /// Extract the session token from a `Bearer <token>` authorization header.
    ///
    /// The `Bearer ` literal is case-sensitive and the remainder must be
    /// non-empty. Returns `None` for anything else.
    pub fn bearer_token(&self) -> Option<SessionToken> {
        let token = self.authorization()?.strip_prefix(BEARER_PREFIX)?;
        if token.is_empty() {
            return None;
        }
        Some(SessionToken::new(token))
    }
}

impl From<&http::HeaderMap> for Credentials {
    /// Repeated headers keep their first value, matching `HeaderMap::get`.
    fn from(headers: &http::HeaderMap) -> Self {
        let mut creds = Self::new();
        for name in headers.keys() {
            // Non-UTF-8 header values cannot carry a bearer token.
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                creds = creds.with_header(name.as_str(), value);
            }
        }
        creds
    }
}
