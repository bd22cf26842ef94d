//! Upstream access token verification against the identity provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::auth::error::VerifyError;
use crate::types::AccessToken;

/// Confirms that an upstream access token is still accepted by the provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, access_token: &AccessToken) -> Result<(), VerifyError>;
}

/// Verifies tokens by fetching the provider's profile endpoint with the
/// token as bearer credential.
pub struct HttpTokenVerifier {
    profile_url: String,
    client: Client,
}

impl HttpTokenVerifier {
    /// Create a verifier for `profile_url`.
    pub fn new(profile_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            profile_url: profile_url.into(),
            client,
        })
    }

    pub fn profile_url(&self) -> &str {
        &self.profile_url
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, access_token: &AccessToken) -> Result<(), VerifyError> {
        if self.profile_url.is_empty() {
            return Err(VerifyError::Transport("profile url not configured".to_string()));
        }

        let response = self
            .client
            .get(&self.profile_url)
            .bearer_auth(access_token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(url = %self.profile_url, %status, "profile lookup");

        if status.as_u16() >= 400 {
            return Err(VerifyError::TokenInvalid {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
