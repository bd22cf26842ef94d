use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::Context;

use crate::auth::OAuthRedirectConfig;

/// Default verification lock TTL (five minutes).
pub const DEFAULT_LOCK_TTL_SECONDS: u64 = 300;

/// Default timeout for the profile lookup.
pub const DEFAULT_VERIFY_TIMEOUT_SECONDS: u64 = 10;

/// Top-level authorizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizerConfig {
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    /// Newline-delimited list of permitted emails
    #[serde(default = "default_whitelist_path")]
    pub user_whitelist_path: PathBuf,
    /// Identity provider profile endpoint used to verify access tokens
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
    #[serde(default = "default_verify_timeout_seconds")]
    pub verify_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            session_store: SessionStoreConfig::default(),
            user_whitelist_path: default_whitelist_path(),
            profile_url: default_profile_url(),
            verify_timeout_seconds: DEFAULT_VERIFY_TIMEOUT_SECONDS,
            user_agent: default_user_agent(),
        }
    }
}

impl AuthorizerConfig {
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_seconds)
    }
}

/// Session store connection and keying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_lock_prefix")]
    pub lock_prefix: String,
    #[serde(default = "default_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
    #[serde(default)]
    pub oauth: OAuthRedirectConfig,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            key_prefix: default_key_prefix(),
            lock_prefix: default_lock_prefix(),
            lock_ttl_seconds: DEFAULT_LOCK_TTL_SECONDS,
            oauth: OAuthRedirectConfig::default(),
        }
    }
}

impl SessionStoreConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Redis { url: String },
}

impl Default for SessionBackend {
    fn default() -> Self {
        match env::var("SESSION_REDIS_URL") {
            Ok(url) => SessionBackend::Redis { url },
            Err(_) => SessionBackend::Memory,
        }
    }
}

fn default_key_prefix() -> String {
    "session:".to_string()
}

fn default_lock_prefix() -> String {
    "lock:".to_string()
}

fn default_lock_ttl_seconds() -> u64 {
    DEFAULT_LOCK_TTL_SECONDS
}

fn default_verify_timeout_seconds() -> u64 {
    DEFAULT_VERIFY_TIMEOUT_SECONDS
}

fn default_user_agent() -> String {
    "registry-authorizer".to_string()
}

fn default_profile_url() -> String {
    env::var("OAUTH2_PROFILE").unwrap_or_default()
}

/// `user-whitelist.txt` next to the installed binary, or in the working
/// directory when the executable path is unknown.
fn default_whitelist_path() -> PathBuf {
    const FILE_NAME: &str = "user-whitelist.txt";

    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(FILE_NAME))
}

/// Locate the config file: `AUTHORIZER_CONFIG`, then `./authorizer.json`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("AUTHORIZER_CONFIG") {
        return Some(PathBuf::from(p));
    }

    let candidate = PathBuf::from("authorizer.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = expand_env_vars(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(expand_value),
        serde_json::Value::Object(map) => map.values_mut().for_each(expand_value),
        _ => {}
    }
}

/// Parse a JSON config document, expanding `${VAR}` references in strings.
pub fn parse_config(raw: &str) -> anyhow::Result<AuthorizerConfig> {
    let mut value: serde_json::Value = serde_json::from_str(raw)?;
    expand_value(&mut value);
    Ok(serde_json::from_value(value)?)
}

/// Load config from `path`, or from the resolved default location, falling
/// back to built-in defaults when no file exists.
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<AuthorizerConfig> {
    let Some(path) = path.or_else(resolve_config_path) else {
        tracing::info!("no config file found, using defaults");
        return Ok(AuthorizerConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_redis_backend() {
        let config = parse_config(
            r#"{
                "session_store": {
                    "backend": { "type": "redis", "url": "redis://cache:6379" },
                    "lock_ttl_seconds": 120,
                    "oauth": {
                        "authorize_url": "https://github.com/login/oauth/authorize",
                        "client_id": "abc"
                    }
                },
                "user_whitelist_path": "/etc/registry/user-whitelist.txt",
                "profile_url": "https://api.github.com/user"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.session_store.backend,
            SessionBackend::Redis {
                url: "redis://cache:6379".to_string()
            }
        );
        assert_eq!(config.session_store.lock_ttl(), Duration::from_secs(120));
        assert_eq!(config.session_store.key_prefix, "session:");
        assert_eq!(config.session_store.oauth.client_id, "abc");
        assert_eq!(
            config.user_whitelist_path,
            PathBuf::from("/etc/registry/user-whitelist.txt")
        );
        assert_eq!(config.profile_url, "https://api.github.com/user");
        assert_eq!(config.verify_timeout_seconds, DEFAULT_VERIFY_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_parse_memory_backend() {
        let config =
            parse_config(r#"{ "session_store": { "backend": { "type": "memory" } } }"#).unwrap();
        assert_eq!(config.session_store.backend, SessionBackend::Memory);
        assert_eq!(config.session_store.lock_ttl_seconds, DEFAULT_LOCK_TTL_SECONDS);
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only, variable name is unique to this test.
        unsafe { env::set_var("AUTHORIZER_TEST_PROFILE", "https://idp.test/user") };
        assert_eq!(
            expand_env_vars("${AUTHORIZER_TEST_PROFILE}?x=1"),
            "https://idp.test/user?x=1"
        );
        assert_eq!(
            expand_env_vars("${AUTHORIZER_TEST_UNSET_VAR}"),
            "${AUTHORIZER_TEST_UNSET_VAR}"
        );

        let config = parse_config(r#"{ "profile_url": "${AUTHORIZER_TEST_PROFILE}" }"#).unwrap();
        assert_eq!(config.profile_url, "https://idp.test/user");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorizer.json");
        fs::write(&path, r#"{ "verify_timeout_seconds": 3 }"#).unwrap();

        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.verify_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_default_whitelist_path_file_name() {
        let path = default_whitelist_path();
        assert_eq!(path.file_name().unwrap(), "user-whitelist.txt");
    }
}
