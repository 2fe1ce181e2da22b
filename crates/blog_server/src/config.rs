//! Environment-driven server configuration.
//!
//! Every key has a default except `BLOG_TOKENS_FILE`, which is required
//! when the server runs in `authenticated` mode.

use blog_core::{default_log_level, UpvotePolicy};
use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Store path value selecting the process-local store.
pub const MEMORY_STORE: &str = ":memory:";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("BLOG_TOKENS_FILE is required when BLOG_AUTH_MODE=authenticated")]
    MissingTokensFile,
}

/// Deployment flavor: decides the upvote policy and the mutation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Anyone may upvote (counter) and comment (client-supplied author).
    Open,
    /// Upvote and comment require a verified identity; upvotes dedup.
    Authenticated,
}

impl AuthMode {
    pub fn upvote_policy(self) -> UpvotePolicy {
        match self {
            Self::Open => UpvotePolicy::Counter,
            Self::Authenticated => UpvotePolicy::Dedup,
        }
    }

    pub fn requires_identity(self) -> bool {
        self == Self::Authenticated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Authenticated => "authenticated",
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(format!("unknown auth mode `{other}`; expected open|authenticated")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub store: StoreLocation,
    pub auth_mode: AuthMode,
    pub tokens_file: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub seed_on_start: bool,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// Loads configuration from process environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = match var(&lookup, "BLOG_DB_PATH") {
            Some(path) if path == MEMORY_STORE => StoreLocation::Memory,
            Some(path) => StoreLocation::File(PathBuf::from(path)),
            None => StoreLocation::File(PathBuf::from("blog.sqlite3")),
        };

        let auth_mode: AuthMode = try_load(&lookup, "BLOG_AUTH_MODE", "authenticated")?;
        let tokens_file = var(&lookup, "BLOG_TOKENS_FILE").map(PathBuf::from);
        if auth_mode.requires_identity() && tokens_file.is_none() {
            return Err(ConfigError::MissingTokensFile);
        }

        Ok(Self {
            bind_addr: try_load(&lookup, "BLOG_BIND_ADDR", "0.0.0.0")?,
            port: try_load(&lookup, "BLOG_PORT", "8000")?,
            store,
            auth_mode,
            tokens_file,
            static_dir: var(&lookup, "BLOG_STATIC_DIR").map(PathBuf::from),
            seed_on_start: try_load(&lookup, "BLOG_SEED_ON_START", "false")?,
            log_level: var(&lookup, "BLOG_LOG_LEVEL")
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: var(&lookup, "BLOG_LOG_DIR"),
        })
    }
}

/// Reads a key, treating blank values as unset.
fn var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(lookup, key).unwrap_or_else(|| default.to_string());
    value.parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{AuthMode, Config, ConfigError, StoreLocation};
    use blog_core::UpvotePolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_require_tokens_file() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingTokensFile);
    }

    #[test]
    fn open_mode_uses_defaults() {
        let config = load(&[("BLOG_AUTH_MODE", "open")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.auth_mode, AuthMode::Open);
        assert_eq!(config.auth_mode.upvote_policy(), UpvotePolicy::Counter);
        assert_eq!(
            config.store,
            StoreLocation::File(PathBuf::from("blog.sqlite3"))
        );
        assert!(!config.seed_on_start);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn authenticated_mode_reads_all_keys() {
        let config = load(&[
            ("BLOG_AUTH_MODE", "Authenticated"),
            ("BLOG_TOKENS_FILE", "/etc/blog/tokens.json"),
            ("BLOG_DB_PATH", ":memory:"),
            ("BLOG_PORT", "9000"),
            ("BLOG_BIND_ADDR", "127.0.0.1"),
            ("BLOG_SEED_ON_START", "true"),
            ("BLOG_STATIC_DIR", "/srv/blog"),
            ("BLOG_LOG_LEVEL", "warn"),
        ])
        .unwrap();

        assert_eq!(config.auth_mode.upvote_policy(), UpvotePolicy::Dedup);
        assert_eq!(config.store, StoreLocation::Memory);
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1");
        assert!(config.seed_on_start);
        assert_eq!(config.static_dir, Some(PathBuf::from("/srv/blog")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = load(&[("BLOG_AUTH_MODE", "open"), ("BLOG_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BLOG_PORT", .. }));

        let err = load(&[("BLOG_AUTH_MODE", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BLOG_AUTH_MODE", .. }));
    }
}
