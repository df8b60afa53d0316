//! Typed cache facade - main entry point for cache operations.

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::key::KeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::serialization::{Codec, JsonCodec};
use crate::single_flight::SingleFlight;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A computed value as handed to every waiter of one computation.
type SharedValue = Arc<dyn Any + Send + Sync>;

/// Computations are shared per namespaced key *and* value type, so callers
/// asking the same key for different types never see each other's values.
type FlightKey = (String, TypeId);

/// Compute function type for passing "no compute" to
/// [`TypedCache::get_or_compute_with_config`].
///
/// ```ignore
/// let cached = cache
///     .get_or_compute_with_config("user:1", None::<NoCompute<User>>, config)
///     .await?;
/// ```
pub type NoCompute<T> =
    fn() -> futures::future::Ready<std::result::Result<T, std::convert::Infallible>>;

/// Per-operation settings for [`TypedCache::get_or_compute_with_config`].
///
/// # Example
///
/// ```ignore
/// use typed_cache::OperationConfig;
/// use tokio_util::sync::CancellationToken;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let config = OperationConfig::new(Duration::from_secs(300))
///     .with_cancellation(token.clone());
///
/// // Elsewhere: token.cancel() makes this caller stop waiting.
/// let user = cache.get_or_compute_with_config("user:1", Some(load_user), config).await?;
/// ```
#[derive(Clone, Debug)]
pub struct OperationConfig {
    /// How long the computed value lives in the store.
    pub ttl: Duration,

    /// Stops this caller's wait when cancelled.
    ///
    /// Cancelling only abandons the *call*. A computation shared with other
    /// waiters keeps running for them; it is dropped only when its last
    /// waiter goes away.
    pub cancellation: Option<CancellationToken>,
}

impl OperationConfig {
    /// Settings with the given time-to-live and no cancellation.
    pub fn new(ttl: Duration) -> Self {
        OperationConfig {
            ttl,
            cancellation: None,
        }
    }

    /// Override the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Typed cache-aside facade over a string store.
///
/// Reads and writes arbitrary serde types by logical key. Store and codec
/// failures are logged and degrade to a miss or a no-op, so the cache can
/// break without breaking the caller.
///
/// Cloning is cheap and clones share the store handle and the in-flight
/// registry, so concurrent `get_or_compute` calls through any clone are
/// deduplicated together.
///
/// # Example
///
/// ```rust
/// use typed_cache::{TypedCache, CacheConfig, backend::InMemoryBackend};
/// use std::time::Duration;
///
/// # #[derive(Clone, serde::Serialize, serde::Deserialize)]
/// # struct Invoice { id: u32, total_cents: u64 }
/// # async fn load_invoice(id: u32) -> std::io::Result<Invoice> {
/// #     Ok(Invoice { id, total_cents: 1250 })
/// # }
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> typed_cache::Result<()> {
/// let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("billing_"));
///
/// let invoice: Invoice = cache
///     .get_or_compute("invoice:42", Duration::from_secs(30), || async {
///         load_invoice(42).await
///     })
///     .await?;
/// assert_eq!(invoice.total_cents, 1250);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TypedCache<B: CacheBackend, C: Codec = JsonCodec> {
    backend: B,
    codec: C,
    keys: KeyBuilder,
    config: Arc<CacheConfig>,
    metrics: Arc<dyn CacheMetrics>,
    flights: SingleFlight<FlightKey, Result<SharedValue>>,
}

impl<B: CacheBackend> TypedCache<B> {
    /// Create a cache over `backend` using the JSON codec.
    pub fn new(backend: B, config: CacheConfig) -> Self {
        TypedCache::with_codec(backend, JsonCodec, config)
    }
}

impl<B: CacheBackend, C: Codec> TypedCache<B, C> {
    /// Create a cache over `backend` with an explicit codec.
    pub fn with_codec(backend: B, codec: C, config: CacheConfig) -> Self {
        TypedCache {
            backend,
            codec,
            keys: KeyBuilder::new(config.key_prefix.clone()),
            config: Arc::new(config),
            metrics: Arc::new(NoOpMetrics),
            flights: SingleFlight::new(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The key builder derived from the configured prefix.
    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Number of keys with a computation currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Read the value stored under `key`.
    ///
    /// Returns `None` when the key is absent or expired, when the cache is
    /// disabled, and when the store or the codec fails (the failure is
    /// logged).
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if !self.config.enabled {
            return None;
        }

        let namespaced = self.namespace("get", key)?;
        self.read("get", &namespaced).await
    }

    /// Like [`get`](Self::get), with an explicit found flag.
    ///
    /// A miss yields `(false, T::default())`. A stored value equal to the
    /// default still yields `(true, value)`.
    pub async fn try_get<T>(&self, key: &str) -> (bool, T)
    where
        T: DeserializeOwned + Default,
    {
        if !self.config.enabled {
            return (false, T::default());
        }

        let found = match self.namespace("try_get", key) {
            Some(namespaced) => self.read("try_get", &namespaced).await,
            None => None,
        };

        match found {
            Some(value) => (true, value),
            None => (false, T::default()),
        }
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// Never fails: a disabled cache makes this a no-op, and store or codec
    /// failures are logged and swallowed.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        if !self.config.enabled {
            return;
        }

        if let Some(namespaced) = self.namespace("set", key) {
            self.write("set", &namespaced, value, ttl).await;
        }
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub async fn remove(&self, key: &str) {
        if !self.config.enabled {
            return;
        }

        let Some(namespaced) = self.namespace("remove", key) else {
            return;
        };

        let timer = Instant::now();
        match self.backend.remove(&namespaced).await {
            Ok(()) => {
                self.metrics.record_remove(&namespaced, timer.elapsed());
                debug!("Removed {}", namespaced);
            }
            Err(e) => self.isolate("remove", &namespaced, &e),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Concurrent calls for the same key (and type) within this process
    /// share one run of `compute`. Store and codec failures only cost a
    /// cache hit; failures of `compute` itself reach every waiter.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidKey`: `key` is empty
    /// - `Error::Compute`: `compute` failed (see [`Error::Compute`])
    pub async fn get_or_compute<T, F, Fut, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> + Send + 'static,
    {
        self.get_or_compute_with_config(key, Some(compute), OperationConfig::new(ttl))
            .await?
            .ok_or_else(|| Error::Other(format!("No value computed for {}", key)))
    }

    /// [`get_or_compute`](Self::get_or_compute) with per-operation settings
    /// and an optional compute function.
    ///
    /// Without a compute function a hit returns `Some(value)` and a miss
    /// returns `Ok(None)` without writing anything.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidKey`: `key` is empty
    /// - `Error::Compute`: `compute` failed
    /// - `Error::Cancelled`: `config.cancellation` fired before a result
    ///   was available
    pub async fn get_or_compute_with_config<T, F, Fut, E>(
        &self,
        key: &str,
        compute: Option<F>,
        config: OperationConfig,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> + Send + 'static,
    {
        let namespaced = self.keys.build(key)?;
        let cancellation = config.cancellation.as_ref();

        if !self.config.enabled {
            let Some(compute) = compute else {
                return Ok(None);
            };
            debug!("Cache disabled, computing {} directly", namespaced);
            let direct = async move { compute().await.map_err(Error::compute) };
            return wait(cancellation, direct).await.map(Some);
        }

        if let Some(value) = self.read::<T>("get_or_compute", &namespaced).await {
            return Ok(Some(value));
        }

        let Some(compute) = compute else {
            debug!("Miss for {} with no compute function", namespaced);
            return Ok(None);
        };

        let joined = self.flights.join((namespaced.clone(), TypeId::of::<T>()), {
            let cache = self.clone();
            let namespaced = namespaced.clone();
            let ttl = config.ttl;
            move || async move { cache.compute_and_store(namespaced, ttl, compute).await }
        });

        if !joined.leader {
            debug!("Joined in-flight computation for {}", namespaced);
            self.metrics.record_coalesced(&namespaced);
        }

        let shared = wait(cancellation, joined.flight).await?;
        shared.downcast_ref::<T>().cloned().map(Some).ok_or_else(|| {
            Error::Other(format!(
                "In-flight value for {} has an unexpected type",
                namespaced
            ))
        })
    }

    /// Run the caller's compute function and write its value through.
    ///
    /// This is the body of a shared computation; it runs at most once per
    /// miss episode and its output is cloned to every waiter.
    async fn compute_and_store<T, F, Fut, E>(
        &self,
        namespaced: String,
        ttl: Duration,
        compute: F,
    ) -> Result<SharedValue>
    where
        T: Serialize + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        let timer = Instant::now();
        let value = match compute().await {
            Ok(value) => value,
            Err(e) => {
                let error = Error::compute(e);
                debug!("Compute for {} failed: {}", namespaced, error);
                return Err(error);
            }
        };
        self.metrics.record_compute(&namespaced, timer.elapsed());

        self.write("get_or_compute", &namespaced, &value, ttl).await;

        let shared: SharedValue = Arc::new(value);
        Ok(shared)
    }

    /// Namespace `key`, isolating an empty key like any other failure.
    fn namespace(&self, operation: &str, key: &str) -> Option<String> {
        match self.keys.build(key) {
            Ok(namespaced) => Some(namespaced),
            Err(e) => {
                self.isolate(operation, key, &e);
                None
            }
        }
    }

    async fn read<T>(&self, operation: &str, namespaced: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let timer = Instant::now();

        let text = match self.backend.get(namespaced).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("✗ Cache miss for {}", namespaced);
                self.metrics.record_miss(namespaced, timer.elapsed());
                return None;
            }
            Err(e) => {
                self.isolate(operation, namespaced, &e);
                self.metrics.record_miss(namespaced, timer.elapsed());
                return None;
            }
        };

        match self.codec.decode::<T>(&text) {
            Ok(value) => {
                debug!("✓ Cache hit for {}", namespaced);
                self.metrics.record_hit(namespaced, timer.elapsed());
                Some(value)
            }
            Err(e) => {
                self.isolate(operation, namespaced, &e);
                self.metrics.record_miss(namespaced, timer.elapsed());
                None
            }
        }
    }

    async fn write<T>(&self, operation: &str, namespaced: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        let timer = Instant::now();

        let text = match self.codec.encode(value) {
            Ok(text) => text,
            Err(e) => return self.isolate(operation, namespaced, &e),
        };

        match self.backend.set(namespaced, text, ttl).await {
            Ok(()) => {
                self.metrics.record_set(namespaced, timer.elapsed());
                info!("Cached {} (expires in {:?})", namespaced, ttl);
            }
            Err(e) => self.isolate(operation, namespaced, &e),
        }
    }

    fn isolate(&self, operation: &str, key: &str, error: &Error) {
        warn!("Cache {} failed for key '{}': {}", operation, key, error);
        self.metrics.record_error(key, operation, &error.to_string());
    }
}

/// Await `work`, giving up early if `cancellation` fires.
async fn wait<V>(
    cancellation: Option<&CancellationToken>,
    work: impl Future<Output = Result<V>>,
) -> Result<V> {
    match cancellation {
        None => work.await,
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            output = work => output,
        },
    }
}
