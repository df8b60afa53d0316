//! Metrics hooks for cache operations.
//!
//! Implement [`CacheMetrics`] to feed hits, misses, writes and isolated
//! failures into your monitoring system:
//!
//! ```ignore
//! use typed_cache::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!     }
//!     // ... implement other methods
//! }
//!
//! let cache = TypedCache::new(backend, config)
//!     .with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! The default methods log through the `log` crate; the facade itself
//! starts with [`NoOpMetrics`].
//!
//! All methods receive the namespaced store key. They are called inline on
//! the request path, so keep them cheap and never panic.

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss (absent, expired, undecodable or unreachable).
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a successful cache write.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a successful cache removal.
    fn record_remove(&self, key: &str, duration: Duration) {
        debug!("Cache REMOVE: {} took {:?}", key, duration);
    }

    /// Record an isolated store or serialization failure.
    fn record_error(&self, key: &str, operation: &str, error: &str) {
        warn!("Cache ERROR in {} for {}: {}", operation, key, error);
    }

    /// Record one run of a caller's compute function.
    fn record_compute(&self, key: &str, duration: Duration) {
        debug!("Cache COMPUTE: {} took {:?}", key, duration);
    }

    /// Record a caller that joined a computation already in flight.
    fn record_coalesced(&self, key: &str) {
        debug!("Cache COALESCED: {}", key);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_remove(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _operation: &str, _error: &str) {}
    fn record_compute(&self, _key: &str, _duration: Duration) {}
    fn record_coalesced(&self, _key: &str) {}
}
