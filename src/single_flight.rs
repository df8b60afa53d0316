//! In-process deduplication of concurrent computations.
//!
//! A [`SingleFlight`] maps keys to the one computation currently running for
//! them. The first caller for a key registers a computation and becomes its
//! leader; every caller that arrives while it is still running gets a clone
//! of the same [`Flight`] and awaits its output instead of starting another.
//!
//! Computations are driven by whoever awaits them. The registry only keeps a
//! weak handle, so when every waiter has gone away the computation is
//! dropped with them. Whether it finishes or is dropped, its registration is
//! removed and the next caller for the key starts a fresh one.
//!
//! The map lock is only held to check-and-insert or to remove; no
//! computation ever runs under it.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A computation any number of callers can await; each gets a clone of the
/// output.
pub type Flight<V> = Shared<BoxFuture<'static, V>>;

struct InFlight<V> {
    /// Distinguishes successive computations registered under one key.
    id: u64,
    flight: WeakShared<BoxFuture<'static, V>>,
}

type FlightMap<K, V> = Arc<Mutex<HashMap<K, InFlight<V>>>>;

/// Outcome of [`SingleFlight::join`].
pub struct Joined<V> {
    /// The computation to await.
    pub flight: Flight<V>,
    /// True if this call registered the computation, false if it joined one
    /// already in flight.
    pub leader: bool,
}

/// Deduplicates concurrent computations per key.
pub struct SingleFlight<K, V> {
    in_flight: FlightMap<K, V>,
    next_id: Arc<AtomicU64>,
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        SingleFlight {
            in_flight: Arc::clone(&self.in_flight),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty coordinator.
    pub fn new() -> Self {
        SingleFlight {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Join the computation running for `key`, or register `compute` as it.
    ///
    /// `compute` is only invoked if this call becomes the leader, and only
    /// once the returned flight is first polled.
    pub fn join<F, Fut>(&self, key: K, compute: F) -> Joined<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock();

        if let Some(flight) = in_flight.get(&key).and_then(|entry| entry.flight.upgrade()) {
            return Joined {
                flight,
                leader: false,
            };
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            in_flight: Arc::clone(&self.in_flight),
            key: key.clone(),
            id,
        };

        let flight = async move {
            let output = compute().await;
            // Deregister before the waiters are woken.
            drop(registration);
            output
        }
        .boxed()
        .shared();

        // `downgrade` only fails for a completed flight; this one was never polled.
        if let Some(weak) = flight.downgrade() {
            in_flight.insert(key, InFlight { id, flight: weak });
        }

        Joined {
            flight,
            leader: true,
        }
    }

    /// Number of keys with a registered computation.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Whether a computation is registered for `key`.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.lock().contains_key(key)
    }
}

/// Removes a computation's entry when the computation finishes or is dropped.
struct Registration<K: Eq + Hash, V> {
    in_flight: FlightMap<K, V>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, V> Drop for Registration<K, V> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        // A newer computation may already own the key.
        if in_flight
            .get(&self.key)
            .is_some_and(|entry| entry.id == self.id)
        {
            in_flight.remove(&self.key);
        }
    }
}
