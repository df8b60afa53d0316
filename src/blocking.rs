//! Blocking facade for synchronous callers.
//!
//! [`TypedCache`] mirrors the async facade one-to-one. It owns a small tokio
//! runtime and drives every call to completion with `block_on`, so it can be
//! shared between plain OS threads (concurrent `get_or_compute` calls from
//! different threads are still deduplicated). It must not be used from
//! inside an async runtime; use [`crate::TypedCache`] there.
//!
//! Compute functions run on the runtime's blocking pool, outside the
//! `block_on` call, so they may use the same blocking cache for other keys.
//! A compute function that waits on its own key never finishes.

use crate::backend::{AnyBackend, CacheBackend};
use crate::cache::OperationConfig;
use crate::config::{CacheConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::observability::CacheMetrics;
use crate::serialization::{Codec, JsonCodec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Compute function type for passing "no compute" to
/// [`TypedCache::get_or_compute_with_config`].
pub type NoCompute<T> = fn() -> std::result::Result<T, std::convert::Infallible>;

/// Blocking typed cache-aside facade.
///
/// # Example
///
/// ```rust
/// use typed_cache::{blocking, CacheConfig, backend::InMemoryBackend};
/// use std::time::Duration;
///
/// # fn build_report() -> std::io::Result<Vec<String>> {
/// #     Ok(vec!["all green".to_string()])
/// # }
/// # fn main() -> typed_cache::Result<()> {
/// let cache = blocking::TypedCache::new(InMemoryBackend::new(), CacheConfig::new("app_"))?;
///
/// let report: Vec<String> = cache.get_or_compute("report:today", Duration::from_secs(60), || {
///     build_report()
/// })?;
/// assert_eq!(report.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TypedCache<B: CacheBackend, C: Codec = JsonCodec> {
    inner: crate::cache::TypedCache<B, C>,
    runtime: Arc<Runtime>,
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("typed-cache-blocking")
        .enable_all()
        .build()
        .map_err(|e| Error::ConfigError(format!("Failed to start cache runtime: {}", e)))
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run a synchronous compute function on the blocking pool.
///
/// A panic inside `compute` surfaces as the `JoinError` it produced.
async fn off_runtime<T, F, E>(compute: F) -> std::result::Result<T, BoxError>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    match tokio::task::spawn_blocking(compute).await {
        Ok(output) => output.map_err(Into::into),
        Err(e) => Err(Box::new(e)),
    }
}

impl<B: CacheBackend> TypedCache<B> {
    /// Create a blocking cache over `backend` using the JSON codec.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the runtime cannot be started.
    pub fn new(backend: B, config: CacheConfig) -> Result<Self> {
        Self::from_async(crate::cache::TypedCache::new(backend, config))
    }
}

impl TypedCache<AnyBackend> {
    /// Build the store selected by `storage` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid configuration and
    /// `Error::BackendError` if the store cannot be set up.
    pub fn from_storage(storage: &StorageConfig, config: CacheConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let backend = runtime.block_on(AnyBackend::from_config(storage))?;

        Ok(TypedCache {
            inner: crate::cache::TypedCache::new(backend, config),
            runtime: Arc::new(runtime),
        })
    }
}

impl<B: CacheBackend, C: Codec> TypedCache<B, C> {
    /// Wrap an existing async facade. The wrapper shares its store and
    /// in-flight registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the runtime cannot be started.
    pub fn from_async(inner: crate::cache::TypedCache<B, C>) -> Result<Self> {
        Ok(TypedCache {
            inner,
            runtime: Arc::new(build_runtime()?),
        })
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.inner = self.inner.with_metrics(metrics);
        self
    }

    /// The wrapped async facade.
    pub fn as_async(&self) -> &crate::cache::TypedCache<B, C> {
        &self.inner
    }

    /// See [`crate::TypedCache::get`].
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.runtime.block_on(self.inner.get(key))
    }

    /// See [`crate::TypedCache::try_get`].
    pub fn try_get<T>(&self, key: &str) -> (bool, T)
    where
        T: DeserializeOwned + Default,
    {
        self.runtime.block_on(self.inner.try_get(key))
    }

    /// See [`crate::TypedCache::set`].
    pub fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        self.runtime.block_on(self.inner.set(key, value, ttl))
    }

    /// See [`crate::TypedCache::remove`].
    pub fn remove(&self, key: &str) {
        self.runtime.block_on(self.inner.remove(key))
    }

    /// See [`crate::TypedCache::get_or_compute`].
    ///
    /// `compute` runs on a blocking-pool thread of the cache's runtime.
    pub fn get_or_compute<T, F, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> + Send + 'static,
    {
        self.runtime
            .block_on(self.inner.get_or_compute(key, ttl, move || off_runtime(compute)))
    }

    /// See [`crate::TypedCache::get_or_compute_with_config`].
    pub fn get_or_compute_with_config<T, F, E>(
        &self,
        key: &str,
        compute: Option<F>,
        config: OperationConfig,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> + Send + 'static,
    {
        let compute = compute.map(|compute| move || off_runtime(compute));
        self.runtime
            .block_on(self.inner.get_or_compute_with_config(key, compute, config))
    }
}
