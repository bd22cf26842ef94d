//! Error types for the authorization pipeline.
//!
//! Only [`AuthError`] reaches callers. [`VerifyError`] is always recovered by
//! the engine, which answers with a redirect instead.

use std::fmt;

use crate::types::Email;

/// Errors raised by a session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the token
    NotFound,
    /// The store could not be reached or rejected the command
    Backend(String),
    /// The stored session could not be decoded
    Decode(String),
}

impl SessionError {
    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Backend(_) => 502,
            Self::Decode(_) => 500,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "session not found"),
            Self::Backend(msg) => write!(f, "session store error: {}", msg),
            Self::Decode(msg) => write!(f, "invalid session record: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from the upstream token verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The identity provider rejected the access token
    TokenInvalid { status: u16 },
    /// The identity provider could not be reached
    Transport(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenInvalid { status } => {
                write!(f, "token no longer valid status = {}", status)
            }
            Self::Transport(msg) => write!(f, "profile request failed: {}", msg),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Caller-visible authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or malformed `Bearer` authorization header
    InvalidCredentials,
    /// The session resolved to an identity outside the whitelist
    NotWhitelisted { email: Email },
    /// Session lookup failed; passed through unchanged
    Session(SessionError),
}

impl AuthError {
    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials => 404,
            Self::NotWhitelisted { .. } => 402,
            Self::Session(err) => err.status_code(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "not found"),
            Self::NotWhitelisted { email } => write!(
                f,
                "{} is not currently part of the trial, please contact an admin",
                email
            ),
            Self::Session(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}
