//! Cache backend implementations.

use crate::config::StorageConfig;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::{CacheStats, InMemoryBackend};
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend, RedisConfig};

/// Trait for the string key-value store behind the facade.
///
/// Abstracts storage operations, allowing swappable backends.
/// Implementations: InMemory (default), Redis, or anything that can hold a
/// string under a string key with an expiration.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability or external storage.
///
/// Every method may fail and may be slow. The facade expects no locking or
/// deduplication from the store.
///
/// **ASYNC:** All methods return `Send` futures so the facade's shared
/// computations can run on any executor thread. Implementations can use
/// plain `async fn`.
pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Retrieve the stored text for a key.
    ///
    /// # Returns
    /// - `Ok(Some(text))` - Value found in cache
    /// - `Ok(None)` - Cache miss (key not found or expired)
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store text under a key, expiring `ttl` after the call.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if key exists in cache (optional optimization).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }
}

/// Any of the stores this crate ships, chosen at runtime from
/// [`StorageConfig`].
#[derive(Clone)]
pub enum AnyBackend {
    /// Process-local store.
    InMemory(InMemoryBackend),
    /// Redis store.
    #[cfg(feature = "redis")]
    Redis(RedisBackend),
}

impl AnyBackend {
    /// Validate `config` and build the selected store.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid configuration and
    /// `Error::BackendError` if the store cannot be set up.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        match config {
            StorageConfig::Memory { .. } => {
                let limit = config
                    .memory_size_limit()
                    .unwrap_or(crate::config::DEFAULT_MEMORY_SIZE_LIMIT);
                Ok(AnyBackend::InMemory(InMemoryBackend::with_size_limit(limit)))
            }
            #[cfg(feature = "redis")]
            StorageConfig::Redis(redis) => Ok(AnyBackend::Redis(
                RedisBackend::new(redis.clone()).await?,
            )),
        }
    }
}

impl CacheBackend for AnyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            AnyBackend::InMemory(b) => b.get(key).await,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(b) => b.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        match self {
            AnyBackend::InMemory(b) => b.set(key, value, ttl).await,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(b) => b.set(key, value, ttl).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self {
            AnyBackend::InMemory(b) => b.remove(key).await,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(b) => b.remove(key).await,
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self {
            AnyBackend::InMemory(b) => b.exists(key).await,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(b) => b.exists(key).await,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self {
            AnyBackend::InMemory(b) => b.health_check().await,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(b) => b.health_check().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_exists_default() {
        let backend = InMemoryBackend::new();
        backend
            .set("key", "value".to_string(), Duration::from_secs(60))
            .await
            .expect("Failed to set key");
        assert!(backend.exists("key").await.expect("Failed to check exists"));
        assert!(!backend
            .exists("nonexistent")
            .await
            .expect("Failed to check exists"));
    }

    #[tokio::test]
    async fn test_any_backend_from_memory_config() {
        let backend = AnyBackend::from_config(&StorageConfig::default())
            .await
            .expect("memory config is valid");

        backend
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await
            .expect("Failed to set");
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));

        backend.remove("k").await.expect("Failed to remove");
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_any_backend_rejects_invalid_config() {
        let result = AnyBackend::from_config(&StorageConfig::Memory {
            size_limit: Some(0),
        })
        .await;
        assert!(matches!(result, Err(crate::Error::ConfigError(_))));
    }
}
