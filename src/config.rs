//! Construction-time configuration.
//!
//! Both types are plain data: build them in code or deserialize them from
//! the hosting application's configuration file. Nothing here looks up
//! ambient process state unless you explicitly call [`CacheConfig::from_env`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variable read by [`CacheConfig::from_env`] for the key prefix.
pub const ENV_KEY_PREFIX: &str = "TYPED_CACHE_KEY_PREFIX";

/// Environment variable read by [`CacheConfig::from_env`] for the enabled flag.
pub const ENV_ENABLED: &str = "TYPED_CACHE_ENABLED";

/// Default in-memory store size limit: 100 MiB.
pub const DEFAULT_MEMORY_SIZE_LIMIT: usize = 100 * 1024 * 1024;

/// Facade configuration, immutable once the cache is built.
///
/// # Example
///
/// ```
/// use typed_cache::CacheConfig;
///
/// let config = CacheConfig::new("billing_").with_enabled(true);
/// assert_eq!(config.key_prefix, "billing_");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prepended verbatim to every logical key.
    pub key_prefix: String,

    /// When false, no store access happens at all.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl CacheConfig {
    /// Enabled configuration with the given key prefix.
    pub fn new(key_prefix: impl Into<String>) -> Self {
        CacheConfig {
            key_prefix: key_prefix.into(),
            enabled: true,
        }
    }

    /// Enable or disable the cache.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Load from `TYPED_CACHE_KEY_PREFIX` and `TYPED_CACHE_ENABLED`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the prefix variable is missing or the
    /// enabled flag is not `true`/`false`.
    pub fn from_env() -> Result<Self> {
        let key_prefix = std::env::var(ENV_KEY_PREFIX)
            .map_err(|_| Error::ConfigError(format!("{} is not set", ENV_KEY_PREFIX)))?;

        let enabled = match std::env::var(ENV_ENABLED) {
            Ok(raw) => raw.trim().parse::<bool>().map_err(|_| {
                Error::ConfigError(format!(
                    "{} must be 'true' or 'false', got '{}'",
                    ENV_ENABLED, raw
                ))
            })?,
            Err(_) => true,
        };

        Ok(CacheConfig {
            key_prefix,
            enabled,
        })
    }
}

/// Which store backs the cache.
///
/// # Example
///
/// ```
/// use typed_cache::config::StorageConfig;
///
/// let storage: StorageConfig =
///     serde_json::from_str(r#"{"type": "memory", "size_limit": 1048576}"#).unwrap();
/// storage.validate().unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local store.
    Memory {
        /// Upper bound on stored payload bytes. `None` means
        /// [`DEFAULT_MEMORY_SIZE_LIMIT`].
        #[serde(default)]
        size_limit: Option<usize>,
    },

    /// Redis store.
    #[cfg(feature = "redis")]
    Redis(crate::backend::RedisConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory { size_limit: None }
    }
}

impl StorageConfig {
    /// Check required fields for the selected store.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        match self {
            StorageConfig::Memory { size_limit } => {
                if *size_limit == Some(0) {
                    return Err(Error::ConfigError(
                        "'size_limit' must be greater than zero for the memory store".to_string(),
                    ));
                }
                Ok(())
            }
            #[cfg(feature = "redis")]
            StorageConfig::Redis(redis) => redis.validate(),
        }
    }

    /// Effective memory size limit (only meaningful for `Memory`).
    pub fn memory_size_limit(&self) -> Option<usize> {
        match self {
            StorageConfig::Memory { size_limit } => {
                Some(size_limit.unwrap_or(DEFAULT_MEMORY_SIZE_LIMIT))
            }
            #[cfg(feature = "redis")]
            StorageConfig::Redis(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_is_enabled() {
        let config = CacheConfig::new("app_");
        assert!(config.enabled);
        assert_eq!(config.key_prefix, "app_");
    }

    #[test]
    fn test_config_deserialize_defaults_enabled() {
        let config: CacheConfig = serde_json::from_str(r#"{"key_prefix": "svc:"}"#).unwrap();
        assert!(config.enabled);

        let config: CacheConfig =
            serde_json::from_str(r#"{"key_prefix": "svc:", "enabled": false}"#).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_config_requires_prefix() {
        let result = serde_json::from_str::<CacheConfig>(r#"{"enabled": true}"#);
        assert!(result.is_err());
    }

    // The only test in the crate that touches these variables.
    #[test]
    fn test_config_from_env() {
        std::env::remove_var(ENV_KEY_PREFIX);
        std::env::remove_var(ENV_ENABLED);
        assert!(matches!(CacheConfig::from_env(), Err(Error::ConfigError(_))));

        std::env::set_var(ENV_KEY_PREFIX, "orders_");
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config, CacheConfig::new("orders_"));

        std::env::set_var(ENV_ENABLED, "false");
        assert!(!CacheConfig::from_env().unwrap().enabled);

        std::env::set_var(ENV_ENABLED, "maybe");
        assert!(matches!(CacheConfig::from_env(), Err(Error::ConfigError(_))));

        std::env::remove_var(ENV_KEY_PREFIX);
        std::env::remove_var(ENV_ENABLED);
    }

    #[test]
    fn test_storage_default_is_memory() {
        let storage = StorageConfig::default();
        assert_eq!(storage.memory_size_limit(), Some(DEFAULT_MEMORY_SIZE_LIMIT));
        storage.validate().unwrap();
    }

    #[test]
    fn test_storage_rejects_zero_limit() {
        let storage = StorageConfig::Memory {
            size_limit: Some(0),
        };
        assert!(matches!(storage.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_storage_unknown_type_rejected() {
        let result = serde_json::from_str::<StorageConfig>(r#"{"type": "sql_server"}"#);
        assert!(result.is_err());
    }
}
