//! Logging contract tests for typed-cache
//!
//! Every isolated store or codec failure is logged at `warn` with the
//! operation name and the namespaced key, and every successful write is
//! logged at `info`. These tests install a capturing logger, so they live in
//! their own test binary.

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::time::Duration;
use typed_cache::backend::{CacheBackend, InMemoryBackend};
use typed_cache::{CacheConfig, Error, TypedCache};

const TTL: Duration = Duration::from_secs(30);

static RECORDS: Mutex<Vec<(Level, String)>> = parking_lot::const_mutex(Vec::new());

struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.lock().push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture;

fn install() {
    // Tests share one process; only the first install succeeds.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Debug);
}

/// Messages at `level` that mention `needle`. Tests run in parallel, so each
/// filters on a key prefix of its own.
fn captured(level: Level, needle: &str) -> Vec<String> {
    RECORDS
        .lock()
        .iter()
        .filter(|(l, message)| *l == level && message.contains(needle))
        .map(|(_, message)| message.clone())
        .collect()
}

/// Store whose every operation fails.
#[derive(Clone, Default)]
struct BrokenBackend;

impl CacheBackend for BrokenBackend {
    async fn get(&self, _key: &str) -> typed_cache::Result<Option<String>> {
        Err(Error::BackendError("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> typed_cache::Result<()> {
        Err(Error::BackendError("connection refused".to_string()))
    }

    async fn remove(&self, _key: &str) -> typed_cache::Result<()> {
        Err(Error::BackendError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_isolated_failures_warn_with_operation_and_key() {
    install();
    let cache = TypedCache::new(BrokenBackend, CacheConfig::new("logwarn_"));

    cache.set("k", &1u32, TTL).await;
    assert_eq!(cache.get::<u32>("k").await, None);
    assert_eq!(cache.try_get::<u32>("k").await, (false, 0));
    cache.remove("k").await;
    let value: u32 = cache
        .get_or_compute("k", TTL, || async { Ok::<_, std::io::Error>(4) })
        .await
        .unwrap();
    assert_eq!(value, 4);

    let warnings = captured(Level::Warn, "'logwarn_k'");
    let operations: Vec<&str> = warnings
        .iter()
        .map(|message| {
            message
                .strip_prefix("Cache ")
                .and_then(|rest| rest.split(' ').next())
                .unwrap_or_default()
        })
        .collect();

    assert_eq!(
        operations,
        vec!["set", "get", "try_get", "remove", "get_or_compute", "get_or_compute"]
    );
    assert!(warnings
        .iter()
        .all(|message| message.contains("connection refused")));
    assert!(captured(Level::Info, "logwarn_k").is_empty());
}

#[tokio::test]
async fn test_codec_failures_warn_with_operation_and_key() {
    install();
    let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("logcodec_"));

    cache.set("nan", &f64::NAN, TTL).await;
    cache.set("text", &"not a number", TTL).await;
    assert_eq!(cache.get::<u64>("text").await, None);

    let encode = captured(Level::Warn, "Cache set failed for key 'logcodec_nan'");
    assert_eq!(encode.len(), 1);
    assert!(encode[0].contains("Serialization error"));

    let decode = captured(Level::Warn, "Cache get failed for key 'logcodec_text'");
    assert_eq!(decode.len(), 1);
    assert!(decode[0].contains("Deserialization error"));
}

#[tokio::test]
async fn test_successful_writes_log_info() {
    install();
    let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("loginfo_"));

    cache.set("a", &"value", TTL).await;
    let _: u32 = cache
        .get_or_compute("b", TTL, || async { Ok::<_, std::io::Error>(2) })
        .await
        .unwrap();
    assert_eq!(cache.get::<u32>("b").await, Some(2));

    assert_eq!(
        captured(Level::Info, "loginfo_"),
        vec![
            format!("Cached loginfo_a (expires in {:?})", TTL),
            format!("Cached loginfo_b (expires in {:?})", TTL),
        ]
    );
    assert!(captured(Level::Warn, "loginfo_").is_empty());
}
