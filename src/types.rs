//! NewType wrappers for the string values that flow through the authorizer.
//!
//! A session token, an upstream access token and an email are all plain
//! strings on the wire; wrapping them keeps a session token from being sent to
//! the identity provider by mistake (and vice versa).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates a string NewType with the usual conversions.
///
/// The `secret` form prints `***` from `Debug` so credentials do not leak into
/// `{:?}` log fields.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        newtype_string!(@common $name);
    };
    (
        $(#[$meta:meta])*
        secret $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(***)", stringify!($name))
            }
        }

        newtype_string!(@common $name);
    };
    (@common $name:ident) => {
        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the value is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Opaque bearer token presented by the registry client.
    ///
    /// This is the primary key into the session store and the lock namespace.
    /// It is never forwarded to the identity provider.
    secret SessionToken
);

newtype_string!(
    /// Third-party access token issued by the identity provider.
    ///
    /// Stored on the user's session and replayed against the profile endpoint
    /// to confirm the grant is still live.
    secret AccessToken
);

newtype_string!(
    /// User email as recorded on the session.
    ///
    /// Case is preserved as stored; whitelist comparisons go through
    /// [`Email::normalized`].
    Email
);

impl Email {
    /// Lower-cased, trimmed form used for whitelist membership.
    pub fn normalized(&self) -> String {
        self.0.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let token = SessionToken::new("abc123");
        assert_eq!(format!("{:?}", token), "SessionToken(***)");
        assert_eq!(token.to_string(), "abc123");

        let access = AccessToken::new("gho_secret");
        assert!(!format!("{:?}", access).contains("gho_secret"));
    }

    #[test]
    fn test_email_normalized() {
        let email = Email::new("  User@Example.COM ");
        assert_eq!(email.normalized(), "user@example.com");
        assert_eq!(email.as_str(), "  User@Example.COM ");
    }

    #[test]
    fn test_serde_transparent() {
        let email: Email = serde_json::from_str("\"a@b.com\"").unwrap();
        assert_eq!(email.as_str(), "a@b.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"a@b.com\"");
    }
}
