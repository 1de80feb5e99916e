//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `WARRANTY_STORE` - Local identity storage: a JSON file path, or a
//!   `sqlite:` URL (default: `.warranty/identity.json`)
//! - `WARRANTY_API_URL` - Warranty backend base URL (default: `http://127.0.0.1:5000`)
//! - `WARRANTY_API_TIMEOUT_SECS` - Backend request timeout (default: 5)
//! - `WARRANTY_EXPIRING_DAYS` - Days before expiry a warranty counts as expiring (default: 60)
//! - `WARRANTY_KEY_MIN` / `WARRANTY_KEY_MAX` - Range for new account keys (default: 1 / 5000)
//! - `WARRANTY_KEY_MAX_ATTEMPTS` - Redraws allowed when a drawn key is taken (default: 32)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use warranty_core::status::DEFAULT_EXPIRING_HORIZON_DAYS;
use warranty_core::{KeySpace, StatusPolicy};

const DEFAULT_STORE: &str = ".warranty/identity.json";
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_API_TIMEOUT_SECS: u64 = 5;
const DEFAULT_KEY_MAX_ATTEMPTS: u32 = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the identity mapping is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// JSON object file on local disk.
    File(PathBuf),
    /// `SQLite` database URL (`sqlite:...`).
    Sqlite(String),
}

impl FromStr for StorageConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("storage location cannot be empty".to_owned());
        }
        if s.starts_with("sqlite:") {
            Ok(Self::Sqlite(s.to_owned()))
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

/// Warranty backend connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the warranty/recommendation service.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Identity assignment settings.
#[derive(Debug, Clone, Copy)]
pub struct IdentityConfig {
    /// Range new account keys are drawn from.
    pub key_space: KeySpace,
    /// How many times a taken key is redrawn before giving up.
    pub max_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            key_space: KeySpace::DEFAULT,
            max_attempts: DEFAULT_KEY_MAX_ATTEMPTS,
        }
    }
}

/// Device-side application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Local identity storage.
    pub storage: StorageConfig,
    /// Backend connection.
    pub api: ApiConfig,
    /// Identity assignment.
    pub identity: IdentityConfig,
    /// Status classification rules.
    pub status_policy: StatusPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = parse_or_default(&lookup, "WARRANTY_STORE", DEFAULT_STORE)?;

        let base_url = parse_or_default::<Url, _>(&lookup, "WARRANTY_API_URL", DEFAULT_API_URL)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "WARRANTY_API_URL".to_owned(),
                "must be an absolute http(s) URL".to_owned(),
            ));
        }
        let timeout_secs: u64 = parse_or_default(
            &lookup,
            "WARRANTY_API_TIMEOUT_SECS",
            &DEFAULT_API_TIMEOUT_SECS.to_string(),
        )?;

        let horizon: u32 = parse_or_default(
            &lookup,
            "WARRANTY_EXPIRING_DAYS",
            &DEFAULT_EXPIRING_HORIZON_DAYS.to_string(),
        )?;

        let key_min: i32 = parse_or_default(
            &lookup,
            "WARRANTY_KEY_MIN",
            &KeySpace::DEFAULT.min().to_string(),
        )?;
        let key_max: i32 = parse_or_default(
            &lookup,
            "WARRANTY_KEY_MAX",
            &KeySpace::DEFAULT.max().to_string(),
        )?;
        let key_space = KeySpace::new(key_min, key_max)
            .map_err(|e| ConfigError::InvalidEnvVar("WARRANTY_KEY_MIN".to_owned(), e.to_string()))?;
        let max_attempts: u32 = parse_or_default(
            &lookup,
            "WARRANTY_KEY_MAX_ATTEMPTS",
            &DEFAULT_KEY_MAX_ATTEMPTS.to_string(),
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "WARRANTY_KEY_MAX_ATTEMPTS".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        let sentry_dsn = lookup("SENTRY_DSN").filter(|v| !v.trim().is_empty());

        Ok(Self {
            storage,
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            identity: IdentityConfig {
                key_space,
                max_attempts,
            },
            status_policy: StatusPolicy::new(horizon),
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when it is unset.
fn parse_or_default<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_owned());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::File(PathBuf::from(".warranty/identity.json"))
        );
        assert_eq!(config.api.base_url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.identity.key_space, KeySpace::DEFAULT);
        assert_eq!(config.identity.max_attempts, 32);
        assert_eq!(config.status_policy.expiring_horizon_days(), 60);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_sqlite_storage() {
        let config = load(&[("WARRANTY_STORE", "sqlite://warranty.db")]).unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite("sqlite://warranty.db".to_owned())
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WARRANTY_API_URL", "https://api.example.test/v1/"),
            ("WARRANTY_API_TIMEOUT_SECS", "12"),
            ("WARRANTY_EXPIRING_DAYS", "30"),
            ("WARRANTY_KEY_MIN", "1000"),
            ("WARRANTY_KEY_MAX", "999999"),
            ("SENTRY_DSN", "https://key@sentry.example.test/1"),
        ])
        .unwrap();
        assert_eq!(config.api.base_url.host_str(), Some("api.example.test"));
        assert_eq!(config.api.timeout, Duration::from_secs(12));
        assert_eq!(config.status_policy.expiring_horizon_days(), 30);
        assert_eq!(config.identity.key_space.min(), 1000);
        assert_eq!(config.identity.key_space.max(), 999_999);
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("WARRANTY_API_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidEnvVar(name, _)) if name == "WARRANTY_API_TIMEOUT_SECS"
        ));
        assert!(load(&[("WARRANTY_API_URL", "not a url")]).is_err());
        assert!(load(&[("WARRANTY_KEY_MIN", "0")]).is_err());
        assert!(load(&[("WARRANTY_KEY_MIN", "10"), ("WARRANTY_KEY_MAX", "5")]).is_err());
        assert!(load(&[("WARRANTY_KEY_MAX_ATTEMPTS", "0")]).is_err());
        assert!(load(&[("WARRANTY_STORE", "  ")]).is_err());
    }

    #[test]
    fn test_blank_sentry_dsn_is_ignored() {
        let config = load(&[("SENTRY_DSN", "")]).unwrap();
        assert!(config.sentry_dsn.is_none());
    }
}
