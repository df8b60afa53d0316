//! Integration tests for cache serialization with a real backend.
//!
//! These tests verify what the codecs actually write to the store, and that
//! entries from other schema versions, other codecs or other writers degrade
//! to misses instead of errors.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use typed_cache::backend::{CacheBackend, InMemoryBackend};
use typed_cache::serialization::{
    CacheEnvelope, Codec, JsonCodec, PostcardCodec, CACHE_MAGIC, CURRENT_SCHEMA_VERSION,
};
use typed_cache::{CacheConfig, TypedCache};

const TTL: Duration = Duration::from_secs(60);

// ============================================================================
// Test Values
// ============================================================================

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
struct User {
    id: u64,
    name: String,
    email: String,
    active: bool,
}

fn alice() -> User {
    User {
        id: 1,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    }
}

// ============================================================================
// What lands in the store
// ============================================================================

#[tokio::test]
async fn test_json_entry_is_readable_envelope() {
    let backend = InMemoryBackend::new();
    let cache = TypedCache::new(backend.clone(), CacheConfig::new("user:"));

    cache.set("1", &alice(), TTL).await;

    let raw = backend.get("user:1").await.unwrap().expect("entry stored");
    let envelope: CacheEnvelope<User> = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope.magic, CACHE_MAGIC);
    assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
    assert_eq!(envelope.payload, alice());
}

#[tokio::test]
async fn test_postcard_entry_is_base64_text() {
    let backend = InMemoryBackend::new();
    let cache = TypedCache::with_codec(backend.clone(), PostcardCodec, CacheConfig::new("user:"));

    cache.set("1", &alice(), TTL).await;

    let raw = backend.get("user:1").await.unwrap().expect("entry stored");
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_err());
    assert!(raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));

    let decoded: User = PostcardCodec.decode(&raw).unwrap();
    assert_eq!(decoded, alice());
}

#[tokio::test]
async fn test_postcard_is_smaller_than_json() {
    let json = JsonCodec.encode(&alice()).unwrap();
    let postcard = PostcardCodec.encode(&alice()).unwrap();

    println!("JSON: {} chars, Postcard: {} chars", json.len(), postcard.len());
    assert!(postcard.len() < json.len());
}

// ============================================================================
// Entries the facade must refuse
// ============================================================================

#[tokio::test]
async fn test_old_schema_version_is_a_miss() {
    let backend = InMemoryBackend::new();
    let cache = TypedCache::new(backend.clone(), CacheConfig::new("user:"));

    let mut stale = CacheEnvelope::new(alice());
    stale.version = CURRENT_SCHEMA_VERSION + 1;
    backend
        .set("user:1", serde_json::to_string(&stale).unwrap(), TTL)
        .await
        .unwrap();

    assert_eq!(cache.get::<User>("1").await, None);

    // get_or_compute replaces it with a current entry.
    let fresh: User = cache
        .get_or_compute("1", TTL, || async { Ok::<_, std::io::Error>(alice()) })
        .await
        .unwrap();
    assert_eq!(fresh, alice());
    assert_eq!(cache.get::<User>("1").await, Some(alice()));
}

#[tokio::test]
async fn test_foreign_magic_is_a_miss() {
    let backend = InMemoryBackend::new();
    let cache = TypedCache::new(backend.clone(), CacheConfig::new("user:"));

    let mut foreign = CacheEnvelope::new(alice());
    foreign.magic = *b"XXXX";
    backend
        .set("user:1", serde_json::to_string(&foreign).unwrap(), TTL)
        .await
        .unwrap();

    assert_eq!(cache.try_get::<u64>("1").await, (false, 0));
    assert_eq!(cache.get::<User>("1").await, None);
}

#[tokio::test]
async fn test_codec_mismatch_is_a_miss() {
    let backend = InMemoryBackend::new();
    let json = TypedCache::new(backend.clone(), CacheConfig::new("user:"));
    let postcard = TypedCache::with_codec(backend.clone(), PostcardCodec, CacheConfig::new("user:"));

    json.set("1", &alice(), TTL).await;
    assert_eq!(postcard.get::<User>("1").await, None);

    postcard.set("2", &alice(), TTL).await;
    assert_eq!(json.get::<User>("2").await, None);
}

#[tokio::test]
async fn test_plain_text_from_other_writers_is_a_miss() {
    let backend = InMemoryBackend::new();
    let cache = TypedCache::new(backend.clone(), CacheConfig::new("user:"));

    backend
        .set("user:1", "Alice".to_string(), TTL)
        .await
        .unwrap();

    assert_eq!(cache.get::<String>("1").await, None);
}

// ============================================================================
// Awkward values
// ============================================================================

#[tokio::test]
async fn test_special_values_round_trip() {
    let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("edge:"));

    let user = User {
        id: u64::MAX,
        name: String::new(),
        email: "名前 \"quoted\" \\ \n\t 🎉".to_string(),
        active: false,
    };
    cache.set("special", &user, TTL).await;
    assert_eq!(cache.get::<User>("special").await, Some(user));

    let large = "x".repeat(100_000);
    cache.set("large", &large, TTL).await;
    assert_eq!(cache.get::<String>("large").await, Some(large));

    cache.set("unit", &(), TTL).await;
    assert_eq!(cache.try_get::<()>("unit").await, (true, ()));

    cache.set("none", &None::<u32>, TTL).await;
    assert_eq!(cache.try_get::<Option<u32>>("none").await, (true, None));
}
