//! Session store contract consumed by the authorizer.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::auth::error::SessionError;
use crate::auth::user::User;
use crate::types::SessionToken;

/// Key-value session backend with per-token lock primitives.
///
/// Lock atomicity is the store's responsibility: concurrent `lock` calls for
/// the same token must not corrupt each other, and `check_lock` must observe
/// a lock as soon as it has been written.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve a session token to its user record.
    async fn get(&self, token: &SessionToken) -> Result<User, SessionError>;

    /// Whether the token currently holds a verification lock.
    ///
    /// Never fails; backend errors read as "not locked".
    async fn check_lock(&self, token: &SessionToken) -> bool;

    /// Set a verification lock on the token for the store's lock TTL.
    ///
    /// Best effort. Implementations may return before the write lands.
    async fn lock(&self, token: &SessionToken);

    /// URL the end user should visit to (re)authenticate with the identity
    /// provider, correlated with `token`.
    async fn redirect_url(&self, token: &SessionToken) -> Result<String, SessionError>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Key name for a token's lock.
///
/// The token is hashed so raw credentials never appear in the keyspace.
pub fn lock_key(prefix: &str, token: &SessionToken) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_str().as_bytes());
    format!("{}{:x}", prefix, hasher.finalize())
}
