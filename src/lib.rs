// Core modules
pub mod api;
pub mod auth;
mod config;
mod types;

// Re-export key types and functions
pub use auth::{
    AuthDecision, AuthError, Authorizer, Credentials, HttpTokenVerifier, MemorySessionStore,
    RedisSessionStore, SessionError, SessionStore, TokenVerifier, User, VerifyError, Whitelist,
};
pub use config::{
    AuthorizerConfig, SessionBackend, SessionStoreConfig, load_config, parse_config,
    resolve_config_path,
};
pub use types::{AccessToken, Email, SessionToken};

use anyhow::Result;
use std::sync::Arc;

/// Convenience function to build a shared authorizer from configuration.
///
/// Connects the session store, loads the whitelist and sets up the profile
/// verifier. Call [`Authorizer::shutdown`] once the host has drained.
pub async fn create_authorizer(config: &AuthorizerConfig) -> Result<Arc<Authorizer>> {
    let authorizer = Authorizer::from_config(config).await?;
    Ok(Arc::new(authorizer))
}
