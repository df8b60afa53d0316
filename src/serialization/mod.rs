//! Text codecs with versioned envelopes.
//!
//! The store only holds strings, so every codec produces text. Every cache
//! entry is wrapped in an envelope before it is written:
//!
//! ```text
//! ┌──────────────────┬─────────────────┬────────────────────┐
//! │  magic: "TCKV"   │ version: u32    │  payload: T        │
//! └──────────────────┴─────────────────┴────────────────────┘
//! ```
//!
//! Two codecs are provided:
//!
//! - [`JsonCodec`] (default): the envelope as JSON text. Readable in
//!   `redis-cli`, tolerant of other tooling.
//! - [`PostcardCodec`]: the envelope as Postcard bytes, base64 encoded.
//!   Smaller and faster, opaque to humans.
//!
//! The target type is always fixed at the call site, so numeric values come
//! back as exactly the type they were stored as (`0u8` stays `0u8`,
//! `1.0f64` stays `1.0f64`). JSON has no representation for `NaN` or
//! infinities, so [`JsonCodec`] refuses to encode values containing them;
//! [`PostcardCodec`] stores them unchanged.
//!
//! # Example
//!
//! ```rust
//! use typed_cache::serialization::{Codec, JsonCodec};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # fn main() -> typed_cache::Result<()> {
//! let user = User { id: 1, name: "Alice".to_string() };
//!
//! let text = JsonCodec.encode(&user)?;
//! let decoded: User = JsonCodec.decode(&text)?;
//! assert_eq!(user, decoded);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod finite;

/// Magic header for typed-cache entries: `b"TCKV"`.
pub const CACHE_MAGIC: [u8; 4] = *b"TCKV";

/// Current schema version.
///
/// **CRITICAL:** Increment this constant when making breaking changes to cached types:
/// - Adding/removing struct fields
/// - Changing field types
/// - Changing enum variants
///
/// When deployed with a new version, old cache entries are treated as
/// absent and recomputed from the source of truth.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for cache entries.
///
/// # Example
///
/// ```rust
/// use typed_cache::serialization::CacheEnvelope;
///
/// let envelope = CacheEnvelope::new("data");
/// assert_eq!(envelope.magic, *b"TCKV");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be `b"TCKV"`
    pub magic: [u8; 4],
    /// Schema version: must match `CURRENT_SCHEMA_VERSION`
    pub version: u32,
    /// The actual cached data
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }

    /// Check magic and version, then hand out the payload.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCacheEntry`: Invalid magic header
    /// - `Error::VersionMismatch`: Schema version mismatch
    pub fn into_payload(self) -> Result<T> {
        if self.magic != CACHE_MAGIC {
            warn!(
                "Invalid cache entry: expected magic {:?}, got {:?}",
                CACHE_MAGIC, self.magic
            );
            return Err(Error::InvalidCacheEntry(format!(
                "Invalid magic: expected {:?}, got {:?}",
                CACHE_MAGIC, self.magic
            )));
        }

        if self.version != CURRENT_SCHEMA_VERSION {
            warn!(
                "Cache version mismatch: expected {}, got {}",
                CURRENT_SCHEMA_VERSION, self.version
            );
            return Err(Error::VersionMismatch {
                expected: CURRENT_SCHEMA_VERSION,
                found: self.version,
            });
        }

        Ok(self.payload)
    }
}

/// Converts typed values to and from the store's text representation.
///
/// Picked at compile time through the facade's codec type parameter.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Encode a value as stored text.
    ///
    /// # Errors
    ///
    /// Returns `Error::SerializationError` if the value cannot be encoded.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Decode stored text into the requested type.
    ///
    /// # Errors
    ///
    /// - `Error::DeserializationError`: text is not a valid encoding of `T`
    /// - `Error::InvalidCacheEntry`: envelope magic is wrong
    /// - `Error::VersionMismatch`: envelope version is not current
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T>;
}

/// JSON envelope codec (default).
///
/// Values containing a non-finite `f32`/`f64` fail to encode with
/// `Error::SerializationError`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        finite::check(value).map_err(|e| {
            warn!("Refusing to encode cache value as JSON: {}", e);
            Error::SerializationError(e.to_string())
        })?;
        serde_json::to_string(&CacheEnvelope::new(value)).map_err(|e| {
            error!("Cache serialization failed: {}", e);
            Error::SerializationError(e.to_string())
        })
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        let envelope: CacheEnvelope<T> = serde_json::from_str(text).map_err(|e| {
            error!("Cache deserialization failed: {}", e);
            Error::DeserializationError(e.to_string())
        })?;
        envelope.into_payload()
    }
}

/// Postcard envelope codec, base64 armored.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostcardCodec;

impl Codec for PostcardCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        let bytes = postcard::to_allocvec(&CacheEnvelope::new(value)).map_err(|e| {
            error!("Cache serialization failed: {}", e);
            Error::SerializationError(e.to_string())
        })?;
        Ok(STANDARD.encode(bytes))
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        let bytes = STANDARD.decode(text).map_err(|e| {
            warn!("Cache entry is not base64: {}", e);
            Error::InvalidCacheEntry(format!("Invalid base64 armor: {}", e))
        })?;
        let envelope: CacheEnvelope<T> = postcard::from_bytes(&bytes).map_err(|e| {
            error!("Cache deserialization failed: {}", e);
            Error::DeserializationError(e.to_string())
        })?;
        envelope.into_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct TestData {
        id: u64,
        name: String,
        active: bool,
    }

    fn sample() -> TestData {
        TestData {
            id: 123,
            name: "test".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let text = JsonCodec.encode(&sample()).unwrap();
        let decoded: TestData = JsonCodec.decode(&text).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_postcard_roundtrip() {
        let text = PostcardCodec.encode(&sample()).unwrap();
        let decoded: TestData = PostcardCodec.decode(&text).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_json_envelope_structure() {
        let text = JsonCodec.encode(&sample()).unwrap();
        let envelope: CacheEnvelope<TestData> = serde_json::from_str(&text).unwrap();

        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.payload, sample());
    }

    #[test]
    fn test_numeric_default_values_keep_their_type() {
        let text = JsonCodec.encode(&0u8).unwrap();
        assert_eq!(JsonCodec.decode::<u8>(&text).unwrap(), 0u8);

        let text = JsonCodec.encode(&1.0f64).unwrap();
        let back: f64 = JsonCodec.decode(&text).unwrap();
        assert_eq!(back.to_bits(), 1.0f64.to_bits());

        let text = PostcardCodec.encode(&i64::MIN).unwrap();
        assert_eq!(PostcardCodec.decode::<i64>(&text).unwrap(), i64::MIN);
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut envelope = CacheEnvelope::new(sample());
        envelope.magic = *b"XXXX";
        let text = serde_json::to_string(&envelope).unwrap();

        match JsonCodec.decode::<TestData>(&text) {
            Err(Error::InvalidCacheEntry(_)) => {}
            other => panic!("Expected InvalidCacheEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut envelope = CacheEnvelope::new(sample());
        envelope.version = 999;
        let text = STANDARD.encode(postcard::to_allocvec(&envelope).unwrap());

        match PostcardCodec.decode::<TestData>(&text) {
            Err(Error::VersionMismatch { expected, found }) => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            other => panic!("Expected VersionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_target_type_rejected() {
        let text = JsonCodec.encode(&"not a number").unwrap();
        assert!(matches!(
            JsonCodec.decode::<u32>(&text),
            Err(Error::DeserializationError(_))
        ));
    }

    #[test]
    fn test_raw_text_rejected() {
        assert!(matches!(
            JsonCodec.decode::<TestData>("plain text"),
            Err(Error::DeserializationError(_))
        ));
        assert!(matches!(
            PostcardCodec.decode::<TestData>("***"),
            Err(Error::InvalidCacheEntry(_))
        ));
    }

    #[test]
    fn test_deterministic_serialization() {
        assert_eq!(
            JsonCodec.encode(&sample()).unwrap(),
            JsonCodec.encode(&sample()).unwrap()
        );
        assert_eq!(
            PostcardCodec.encode(&sample()).unwrap(),
            PostcardCodec.encode(&sample()).unwrap()
        );
    }

    #[test]
    fn test_json_rejects_non_finite_floats() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                JsonCodec.encode(&Some(value)),
                Err(Error::SerializationError(_))
            ));
        }
        assert!(matches!(
            JsonCodec.encode(&vec![(1u8, f32::INFINITY)]),
            Err(Error::SerializationError(_))
        ));
    }

    #[test]
    fn test_postcard_keeps_non_finite_floats() {
        let text = PostcardCodec.encode(&Some(f64::NEG_INFINITY)).unwrap();
        assert_eq!(
            PostcardCodec.decode::<Option<f64>>(&text).unwrap(),
            Some(f64::NEG_INFINITY)
        );

        let text = PostcardCodec.encode(&f32::NAN).unwrap();
        assert!(PostcardCodec.decode::<f32>(&text).unwrap().is_nan());
    }

    #[test]
    fn test_postcard_smaller_than_json() {
        let postcard_text = PostcardCodec.encode(&sample()).unwrap();
        let json_text = JsonCodec.encode(&sample()).unwrap();

        assert!(
            postcard_text.len() < json_text.len(),
            "Postcard ({} chars) should be smaller than JSON ({} chars)",
            postcard_text.len(),
            json_text.len()
        );
    }
}
