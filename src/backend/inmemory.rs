//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Automatically handles TTL expiration on access.

use super::CacheBackend;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-memory cache entry with its absolute expiration.
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: String, ttl: Duration) -> Self {
        // A ttl too large to represent never expires in practice.
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60));
        CacheEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe async in-memory cache backend.
///
/// Uses DashMap for lock-free concurrent access with fine-grained per-key sharding.
/// Expired entries are dropped lazily when touched, or in bulk when a write
/// would exceed the size limit.
///
/// # Example
///
/// ```no_run
/// use typed_cache::backend::{InMemoryBackend, CacheBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("key1", "value".to_string(), Duration::from_secs(300)).await?;
///
///     let value = backend.get("key1").await?;
///     assert!(value.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
    /// Bytes currently held by live and not-yet-purged entries.
    used_bytes: Arc<AtomicUsize>,
    size_limit: Option<usize>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend without a size limit.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            used_bytes: Arc::new(AtomicUsize::new(0)),
            size_limit: None,
        }
    }

    /// Create a backend that refuses writes once `limit` payload bytes are held.
    pub fn with_size_limit(limit: usize) -> Self {
        InMemoryBackend {
            size_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Get the current number of entries in cache.
    pub async fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Get memory statistics.
    pub async fn stats(&self) -> CacheStats {
        let expired_count = self.store.iter().filter(|entry| entry.is_expired()).count();

        CacheStats {
            total_entries: self.store.len(),
            expired_entries: expired_count,
            total_bytes: self.used_bytes.load(Ordering::Relaxed),
            size_limit: self.size_limit,
        }
    }

    /// Drop every entry (use with caution).
    pub async fn clear_all(&self) {
        self.store.clear();
        self.used_bytes.store(0, Ordering::Relaxed);
        warn!("InMemory CLEAR_ALL executed - all cache cleared!");
    }

    fn entry_size(key: &str, data: &str) -> usize {
        key.len() + data.len()
    }

    fn remove_entry(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Some((k, entry)) => {
                self.used_bytes
                    .fetch_sub(Self::entry_size(&k, &entry.data), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn purge_expired(&self) -> usize {
        let expired: Vec<String> = self
            .store
            .iter()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut purged = 0;
        for key in expired {
            if self
                .store
                .remove_if(&key, |_, entry| entry.is_expired())
                .map(|(k, entry)| {
                    self.used_bytes
                        .fetch_sub(Self::entry_size(&k, &entry.data), Ordering::Relaxed)
                })
                .is_some()
            {
                purged += 1;
            }
        }
        purged
    }

    /// Reserve `incoming` bytes against the size limit.
    ///
    /// The check and the increment are one atomic update, so concurrent
    /// writers can never push `used_bytes` past the limit.
    fn reserve(&self, incoming: usize) -> bool {
        let Some(limit) = self.size_limit else {
            self.used_bytes.fetch_add(incoming, Ordering::Relaxed);
            return true;
        };
        self.used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(incoming).filter(|total| *total <= limit)
            })
            .is_ok()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                debug!("InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        }

        // The read guard above is released here, so removal cannot deadlock.
        if self
            .store
            .remove_if(key, |_, entry| entry.is_expired())
            .map(|(k, entry)| {
                self.used_bytes
                    .fetch_sub(Self::entry_size(&k, &entry.data), Ordering::Relaxed)
            })
            .is_some()
        {
            debug!("InMemory GET {} -> EXPIRED", key);
        } else {
            debug!("InMemory GET {} -> MISS", key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let incoming = Self::entry_size(key, &value);

        if !self.reserve(incoming) {
            let purged = self.purge_expired();
            // The value being replaced gives up its space, even if the new
            // one still does not fit.
            let replaced = self.remove_entry(key);
            debug!(
                "InMemory purged {} expired entries (replaced: {}) to make room",
                purged, replaced
            );

            if !self.reserve(incoming) {
                return Err(Error::BackendError(format!(
                    "In-memory size limit of {} bytes reached while writing key {}",
                    self.size_limit.unwrap_or_default(),
                    key
                )));
            }
        }

        let entry = CacheEntry::new(value, ttl);
        if let Some(previous) = self.store.insert(key.to_string(), entry) {
            self.used_bytes
                .fetch_sub(Self::entry_size(key, &previous.data), Ordering::Relaxed);
        }

        debug!("InMemory SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.remove_entry(key);
        debug!("InMemory REMOVE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if let Some(entry) = self.store.get(key) {
            return Ok(!entry.is_expired());
        }

        Ok(false)
    }
}

/// Cache statistics.
#[derive(Clone, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
    pub size_limit: Option<usize>,
}
