//! Example demonstrating store swapping.
//!
//! The in-memory store always runs. With `--features redis` and
//! `REDIS_URL` set, the same code also runs against Redis.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use typed_cache::{
    backend::{AnyBackend, CacheBackend, InMemoryBackend},
    blocking,
    error::Result,
    CacheConfig, PostcardCodec, StorageConfig, TypedCache,
};

#[derive(Clone, Serialize, Deserialize, Debug)]
struct User {
    id: u64,
    name: String,
    email: String,
}

async fn load_user(id: u64) -> std::io::Result<User> {
    Ok(User {
        id,
        name: format!("User {}", id),
        email: format!("user{}@example.com", id),
    })
}

/// Generic function that works with any cache backend
async fn demonstrate_cache<B: CacheBackend>(backend: B, backend_name: &str) -> Result<()> {
    println!("\n--- Using {} Backend ---", backend_name);

    println!("Healthy: {}", backend.health_check().await?);

    let cache = TypedCache::new(backend, CacheConfig::new("demo_"));
    let user: User = cache
        .get_or_compute("user:1", Duration::from_secs(60), || load_user(1))
        .await?;
    println!("Computed: {:?}", user);

    let hit: Option<User> = cache.get("user:1").await;
    println!("Cached:   {:?}", hit);

    cache.remove("user:1").await;
    println!("✓ {} backend works!", backend_name);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    println!("=== Backend Swapping Example ===");

    // InMemory backend
    demonstrate_cache(InMemoryBackend::new(), "InMemory").await?;

    // Store chosen from configuration
    let storage = StorageConfig::Memory {
        size_limit: Some(1024 * 1024),
    };
    demonstrate_cache(AnyBackend::from_config(&storage).await?, "Configured").await?;

    // Redis backend
    #[cfg(feature = "redis")]
    {
        match std::env::var("REDIS_URL") {
            Ok(url) => {
                let backend =
                    typed_cache::backend::RedisBackend::from_connection_string(&url).await?;
                demonstrate_cache(backend, "Redis").await?;
            }
            Err(_) => println!("\n(Set REDIS_URL to also run against Redis)"),
        }
    }

    // Compact binary entries
    println!("\n--- Using the Postcard codec ---");
    let compact = TypedCache::with_codec(
        InMemoryBackend::new(),
        PostcardCodec,
        CacheConfig::new("demo_"),
    );
    compact
        .set("user:2", &load_user(2).await?, Duration::from_secs(60))
        .await;
    let raw = compact.backend().get("demo_user:2").await?;
    println!("Stored text: {:?}", raw);

    // Blocking facade, from plain threads
    println!("\n--- Using the blocking facade ---");
    tokio::task::spawn_blocking(|| -> Result<()> {
        let cache = blocking::TypedCache::from_storage(
            &StorageConfig::default(),
            CacheConfig::new("sync_"),
        )?;
        let user: User = cache.get_or_compute("user:3", Duration::from_secs(60), || {
            Ok::<_, std::io::Error>(User {
                id: 3,
                name: "Sync".to_string(),
                email: "sync@example.com".to_string(),
            })
        })?;
        println!("Blocking facade computed: {:?}", user);
        Ok(())
    })
    .await
    .map_err(|e| typed_cache::Error::Other(e.to_string()))??;

    println!("\n=== Example Complete ===");
    Ok(())
}
