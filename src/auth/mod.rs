//! Registry authorization.
//!
//! Decides per request whether a bearer token identifies a permitted user:
//!
//! - **Credentials**: `Authorization: Bearer <token>` parsing
//! - **Session store**: token → user lookup plus per-token verification locks
//! - **Whitelist**: static allow-list loaded at startup
//! - **Verifier**: live check of the user's upstream access token
//! - **Authorizer**: the decision pipeline tying these together
//!
//! ## Usage
//!
//! ```ignore
//! let authorizer = Authorizer::from_config(&config).await?;
//!
//! match authorizer.authorize(&Credentials::from(&headers)).await? {
//!     AuthDecision::Allowed(user) => { /* serve the request */ }
//!     AuthDecision::Redirect(url) => { /* send the client to `url` */ }
//! }
//! ```

mod authorizer;
mod credentials;
mod error;
mod memory;
mod redirect;
mod redis;
mod session;
mod user;
mod verifier;
mod whitelist;

pub use authorizer::{AuthDecision, Authorizer};
pub use credentials::{BEARER_PREFIX, Credentials};
pub use error::{AuthError, SessionError, VerifyError};
pub use memory::MemorySessionStore;
pub use redirect::{OAuthRedirect, OAuthRedirectConfig};
pub use redis::RedisSessionStore;
pub use session::{SessionStore, lock_key};
pub use user::User;
pub use verifier::{HttpTokenVerifier, TokenVerifier};
pub use whitelist::Whitelist;
