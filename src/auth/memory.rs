//! In-process session store.
//!
//! Holds sessions and locks in memory with lock expiry. Used for local
//! single-node runs and as the session backend in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::error::SessionError;
use crate::auth::redirect::OAuthRedirect;
use crate::auth::session::SessionStore;
use crate::auth::user::User;
use crate::types::SessionToken;

/// Map-backed [`SessionStore`].
#[derive(Clone)]
pub struct MemorySessionStore {
    users: Arc<Mutex<HashMap<SessionToken, User>>>,
    locks: Arc<Mutex<HashMap<SessionToken, DateTime<Utc>>>>,
    lock_ttl: Duration,
    redirect: OAuthRedirect,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    get: AtomicUsize,
    check_lock: AtomicUsize,
    lock: AtomicUsize,
    closed: AtomicUsize,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new(lock_ttl: Duration, redirect: OAuthRedirect) -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            locks: Arc::new(Mutex::new(HashMap::new())),
            lock_ttl,
            redirect,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Register a session.
    pub async fn insert_user(&self, token: impl Into<SessionToken>, user: User) {
        self.users.lock().await.insert(token.into(), user);
    }

    /// Remove a session.
    pub async fn remove_user(&self, token: &SessionToken) -> Option<User> {
        self.users.lock().await.remove(token)
    }

    /// Drop expired lock entries. Returns how many were removed.
    pub async fn cleanup_expired_locks(&self) -> usize {
        let now = Utc::now();
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, expires_at| *expires_at > now);
        before - locks.len()
    }

    pub fn get_calls(&self) -> usize {
        self.counters.get.load(Ordering::SeqCst)
    }

    pub fn check_lock_calls(&self) -> usize {
        self.counters.check_lock.load(Ordering::SeqCst)
    }

    pub fn lock_calls(&self) -> usize {
        self.counters.lock.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.counters.closed.load(Ordering::SeqCst) > 0
    }

    fn expiry(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.lock_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        Utc::now() + ttl
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: &SessionToken) -> Result<User, SessionError> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .await
            .get(token)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    async fn check_lock(&self, token: &SessionToken) -> bool {
        self.counters.check_lock.fetch_add(1, Ordering::SeqCst);
        let locks = self.locks.lock().await;
        locks
            .get(token)
            .is_some_and(|expires_at| *expires_at > Utc::now())
    }

    async fn lock(&self, token: &SessionToken) {
        self.counters.lock.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let expires_at = self.expiry();
        let mut locks = self.locks.lock().await;
        // Set-if-absent: a live lock keeps its original expiry.
        match locks.get(token) {
            Some(existing) if *existing > now => {
                debug!("lock already held");
            }
            _ => {
                locks.insert(token.clone(), expires_at);
            }
        }
    }

    async fn redirect_url(&self, token: &SessionToken) -> Result<String, SessionError> {
        self.redirect.url_for(token)
    }

    async fn close(&self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.locks.lock().await.clear();
    }
}
