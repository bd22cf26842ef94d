//! Per-request authorization decisions.
//!
//! The pipeline for a request is:
//!
//! 1. Parse the `Bearer <token>` header (fails with `InvalidCredentials`).
//! 2. Resolve the session for the token (store errors pass through).
//! 3. Whitelist gate (skipped by [`Authorizer::identify`]).
//! 4. No access token on the session: answer with the re-auth redirect.
//! 5. Token locked: allow without calling the identity provider.
//! 6. Otherwise verify upstream; on success set the lock and allow, on any
//!    failure answer with the re-auth redirect.
//!
//! The lock turns a burst of requests for a freshly verified token into a
//! single profile lookup. Lock atomicity is owned by the session store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::auth::credentials::Credentials;
use crate::auth::error::AuthError;
use crate::auth::memory::MemorySessionStore;
use crate::auth::redirect::OAuthRedirect;
use crate::auth::redis::RedisSessionStore;
use crate::auth::session::SessionStore;
use crate::auth::user::User;
use crate::auth::verifier::{HttpTokenVerifier, TokenVerifier};
use crate::auth::whitelist::Whitelist;
use crate::config::{AuthorizerConfig, SessionBackend};
use crate::types::SessionToken;

/// Successful outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// The user is authorized
    Allowed(User),
    /// The user must (re)authenticate at this URL
    Redirect(String),
}

impl AuthDecision {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Allowed(user) => Some(user),
            Self::Redirect(_) => None,
        }
    }

    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Self::Allowed(_) => None,
            Self::Redirect(url) => Some(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhitelistGate {
    Enforce,
    Skip,
}

/// Authorization engine.
///
/// Holds no per-request state; safe to share behind an `Arc` and call
/// concurrently.
pub struct Authorizer {
    session: Arc<dyn SessionStore>,
    verifier: Arc<dyn TokenVerifier>,
    whitelist: Whitelist,
}

impl Authorizer {
    /// Assemble an authorizer from its collaborators.
    pub fn new(
        session: Arc<dyn SessionStore>,
        verifier: Arc<dyn TokenVerifier>,
        whitelist: Whitelist,
    ) -> Self {
        Self {
            session,
            verifier,
            whitelist,
        }
    }

    /// Build an authorizer from configuration: connect the session store,
    /// load the whitelist and set up the profile verifier.
    pub async fn from_config(config: &AuthorizerConfig) -> Result<Self> {
        let store_config = &config.session_store;
        let redirect = OAuthRedirect::new(store_config.oauth.clone());

        let session: Arc<dyn SessionStore> = match &store_config.backend {
            SessionBackend::Memory => {
                info!("using in-memory session store");
                Arc::new(MemorySessionStore::new(store_config.lock_ttl(), redirect))
            }
            SessionBackend::Redis { url } => Arc::new(
                RedisSessionStore::connect(
                    url,
                    store_config.key_prefix.clone(),
                    store_config.lock_prefix.clone(),
                    store_config.lock_ttl(),
                    redirect,
                )
                .await
                .context("failed to connect session store")?,
            ),
        };

        if config.profile_url.is_empty() {
            warn!("no profile url configured; every upstream verification will fail");
        }
        let verifier = HttpTokenVerifier::new(
            config.profile_url.clone(),
            config.verify_timeout(),
            &config.user_agent,
        )?;

        let whitelist = Whitelist::load(&config.user_whitelist_path);

        Ok(Self::new(session, Arc::new(verifier), whitelist))
    }

    /// The whitelist loaded at construction.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Decide whether `credentials` identify a permitted user.
    pub async fn authorize(&self, credentials: &Credentials) -> Result<AuthDecision, AuthError> {
        self.decide(credentials, WhitelistGate::Enforce).await
    }

    /// Same as [`Authorizer::authorize`] without the whitelist gate.
    ///
    /// Used during the identity-provider handshake, before whitelist
    /// membership means anything.
    pub async fn identify(&self, credentials: &Credentials) -> Result<AuthDecision, AuthError> {
        self.decide(credentials, WhitelistGate::Skip).await
    }

    /// Release the session store connection.
    ///
    /// Requests still in flight when this runs see undefined store behavior;
    /// drain first.
    pub async fn shutdown(&self) {
        self.session.close().await;
        info!("authorizer shut down");
    }

    async fn decide(
        &self,
        credentials: &Credentials,
        gate: WhitelistGate,
    ) -> Result<AuthDecision, AuthError> {
        let token = credentials
            .bearer_token()
            .ok_or(AuthError::InvalidCredentials)?;

        let mut user = self.session.get(&token).await?;

        if gate == WhitelistGate::Enforce && !self.whitelist.contains(&user.email) {
            debug!(email = %user.email, "rejected by whitelist");
            return Err(AuthError::NotWhitelisted { email: user.email });
        }

        let Some(access_token) = user.live_access_token().cloned() else {
            debug!(email = %user.email, "no access token on session, redirecting");
            return self.redirect(&token).await;
        };

        // This engine is authoritative; downstream layers must not cache.
        user.cache_allowed = false;

        if self.session.check_lock(&token).await {
            debug!(email = %user.email, "token locked, skipping upstream verification");
            return Ok(AuthDecision::Allowed(user));
        }

        match self.verifier.verify(&access_token).await {
            Ok(()) => {
                self.session.lock(&token).await;
                debug!(email = %user.email, "access token verified");
                Ok(AuthDecision::Allowed(user))
            }
            Err(e) => {
                warn!(email = %user.email, "upstream verification failed: {}", e);
                self.redirect(&token).await
            }
        }
    }

    async fn redirect(&self, token: &SessionToken) -> Result<AuthDecision, AuthError> {
        let url = self.session.redirect_url(token).await?;
        Ok(AuthDecision::Redirect(url))
    }
}
