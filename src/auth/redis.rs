//! Redis-backed session store.
//!
//! Sessions live under `<key_prefix><token>` as JSON user records written by
//! the OAuth callback. Verification locks live under
//! `<lock_prefix><sha256(token)>` and are written with `SET NX EX` so the
//! first writer wins and Redis owns expiry.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fred::clients::Pool;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::{Config, ReconnectPolicy};
use fred::types::{Builder, Expiration, SetOptions};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::auth::error::SessionError;
use crate::auth::redirect::OAuthRedirect;
use crate::auth::session::{SessionStore, lock_key};
use crate::auth::user::User;
use crate::types::SessionToken;

/// Connection pool size.
const POOL_SIZE: usize = 4;

/// [`SessionStore`] over a Redis connection pool.
pub struct RedisSessionStore {
    pool: Pool,
    key_prefix: String,
    lock_prefix: String,
    lock_ttl: Duration,
    redirect: OAuthRedirect,
    /// Lock writes still in flight; drained by `close` before QUIT.
    pending_locks: Mutex<JoinSet<()>>,
}

impl RedisSessionStore {
    /// Connect to Redis at `url` and verify the connection with a PING.
    pub async fn connect(
        url: &str,
        key_prefix: String,
        lock_prefix: String,
        lock_ttl: Duration,
        redirect: OAuthRedirect,
    ) -> Result<Self> {
        let config = Config::from_url(url).with_context(|| format!("invalid redis url {url}"))?;

        let mut builder = Builder::from_config(config);
        // Exponential reconnect: initial 0ms, base 100ms, max 30s, factor 2.
        builder.set_policy(ReconnectPolicy::new_exponential(0, 100, 30_000, 2));

        let pool = builder
            .build_pool(POOL_SIZE)
            .context("failed to build redis connection pool")?;
        pool.init().await.context("failed to connect to redis")?;

        let _: String = pool
            .ping(None)
            .await
            .context("redis PING failed after connect")?;

        info!(pool_size = POOL_SIZE, "session store connected");

        Ok(Self::from_pool(pool, key_prefix, lock_prefix, lock_ttl, redirect))
    }

    /// Wrap an already initialized pool.
    pub fn from_pool(
        pool: Pool,
        key_prefix: String,
        lock_prefix: String,
        lock_ttl: Duration,
        redirect: OAuthRedirect,
    ) -> Self {
        Self {
            pool,
            key_prefix,
            lock_prefix,
            lock_ttl,
            redirect,
            pending_locks: Mutex::new(JoinSet::new()),
        }
    }

    fn session_key(&self, token: &SessionToken) -> String {
        session_key(&self.key_prefix, token)
    }
}

fn session_key(prefix: &str, token: &SessionToken) -> String {
    format!("{}{}", prefix, token.as_str())
}

/// TTL in whole seconds, at least one.
fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, token: &SessionToken) -> Result<User, SessionError> {
        let raw: Option<String> = self
            .pool
            .get(self.session_key(token))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;

        let raw = raw.ok_or(SessionError::NotFound)?;
        serde_json::from_str(&raw).map_err(|e| SessionError::Decode(e.to_string()))
    }

    async fn check_lock(&self, token: &SessionToken) -> bool {
        let key = lock_key(&self.lock_prefix, token);
        match self.pool.exists::<bool, _>(key.as_str()).await {
            Ok(locked) => {
                trace!(%key, locked, "check_lock");
                locked
            }
            Err(e) => {
                warn!(%key, "lock check failed, treating as unlocked: {}", e);
                false
            }
        }
    }

    async fn lock(&self, token: &SessionToken) {
        let key = lock_key(&self.lock_prefix, token);
        let ttl = ttl_seconds(self.lock_ttl);
        let pool = self.pool.clone();

        let mut pending = self.pending_locks.lock().await;
        while pending.try_join_next().is_some() {}

        // The request path does not wait on the write.
        pending.spawn(async move {
            let result: Result<Option<String>, _> = pool
                .set(
                    key.as_str(),
                    "1",
                    Some(Expiration::EX(ttl)),
                    Some(SetOptions::NX),
                    false,
                )
                .await;
            match result {
                Ok(set) => debug!(%key, ttl, acquired = set.is_some(), "lock"),
                Err(e) => warn!(%key, "failed to set verification lock: {}", e),
            }
        });
    }

    async fn redirect_url(&self, token: &SessionToken) -> Result<String, SessionError> {
        self.redirect.url_for(token)
    }

    async fn close(&self) {
        {
            let mut pending = self.pending_locks.lock().await;
            while pending.join_next().await.is_some() {}
        }

        if let Err(e) = self.pool.quit().await {
            warn!("error closing session store: {}", e);
        } else {
            info!("session store closed");
        }
    }
}
