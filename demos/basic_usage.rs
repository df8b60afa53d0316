//! Basic usage example of the typed cache facade.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use typed_cache::{
    backend::InMemoryBackend, error::Result, CacheConfig, CancellationToken, Error, NoCompute,
    OperationConfig, TypedCache,
};

/// Example value: a user profile
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u64,
    name: String,
}

/// Mock system of record that counts how often it is queried.
#[derive(Clone, Default)]
struct UserDatabase {
    queries: Arc<AtomicUsize>,
}

impl UserDatabase {
    async fn load(&self, id: u64) -> std::io::Result<User> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        println!("  [DB] Loading user {}", id);
        tokio::time::sleep(Duration::from_millis(100)).await;

        Ok(User {
            id,
            name: format!("User {}", id),
        })
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== typed-cache - Basic Example ===\n");

    // 1. Initialize cache
    println!("1. Creating a cache over the in-memory store...");
    let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("accounts_"));
    let db = UserDatabase::default();
    println!("   ✓ Cache ready\n");

    // 2. Set / get / remove
    println!("2. Set, get and remove u1:");
    let u1 = User {
        id: 1,
        name: "A".to_string(),
    };
    cache.set("u1", &u1, Duration::from_secs(30)).await;
    println!("   get(u1) -> {:?}", cache.get::<User>("u1").await);
    cache.remove("u1").await;
    println!("   after remove -> {:?}\n", cache.get::<User>("u1").await);

    // 3. Zero values are found, not missed
    println!("3. try_get tells a stored zero from a miss:");
    cache.set("unread", &0u32, Duration::from_secs(30)).await;
    println!("   try_get(unread)  -> {:?}", cache.try_get::<u32>("unread").await);
    println!("   try_get(missing) -> {:?}\n", cache.try_get::<u32>("missing").await);

    // 4. Cache-aside: the first call computes, the second hits
    println!("4. get_or_compute for user 2:");
    for attempt in 1..=2 {
        let db = db.clone();
        let user: User = cache
            .get_or_compute("user:2", Duration::from_secs(30), move || async move {
                db.load(2).await
            })
            .await?;
        println!("   attempt {} -> {:?}", attempt, user);
    }
    println!("   ✓ Database queried {} time(s)\n", db.queries());

    // 5. Single-flight: concurrent misses share one computation
    println!("5. 10 concurrent get_or_compute calls for user 3:");
    let before = db.queries();
    let calls = (0..10).map(|_| {
        let db = db.clone();
        cache.get_or_compute("user:3", Duration::from_secs(30), move || async move {
            db.load(3).await
        })
    });
    let users = futures::future::join_all(calls).await;
    println!(
        "   ✓ {} callers answered, database queried {} time(s)\n",
        users.iter().filter(|u| u.is_ok()).count(),
        db.queries() - before
    );

    // ========================================================================
    // ADVANCED USAGE: Per-Operation Configuration
    // ========================================================================

    println!("\n=== Advanced Usage Examples ===\n");

    // 6. Cache-only lookup with no compute function
    println!("6. Lookup without a compute function:");
    let config = OperationConfig::new(Duration::from_secs(30));
    let cached = cache
        .get_or_compute_with_config("user:2", None::<NoCompute<User>>, config.clone())
        .await?;
    let absent = cache
        .get_or_compute_with_config("user:404", None::<NoCompute<User>>, config)
        .await?;
    println!("   user:2   -> {:?}", cached);
    println!("   user:404 -> {:?}\n", absent);

    // 7. Cancelling a wait
    println!("7. Cancelling a slow computation:");
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        }
    };
    let slow = {
        let db = db.clone();
        move || async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            db.load(4).await
        }
    };
    let (result, ()) = tokio::join!(
        cache.get_or_compute_with_config(
            "user:4",
            Some(slow),
            OperationConfig::new(Duration::from_secs(30)).with_cancellation(token),
        ),
        canceller,
    );
    match result {
        Err(Error::Cancelled) => println!("   ✓ Caller stopped waiting\n"),
        other => println!("   unexpected: {:?}\n", other),
    }

    println!("=== Example Complete ===\n");
    Ok(())
}
