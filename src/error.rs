//! Error types for the typed cache.

use std::fmt;
use std::sync::Arc;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error reported by a caller-supplied compute function.
///
/// Shared between every waiter of one in-flight computation, hence the `Arc`.
pub type ComputeError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the typed cache.
///
/// Only a few of these ever reach a caller of the facade. Store and
/// serialization failures are logged and degraded to a miss or no-op inside
/// [`TypedCache`](crate::TypedCache); see [`Error::is_cache_failure`].
#[derive(Debug, Clone)]
pub enum Error {
    /// An operation that requires a key was given an empty one.
    ///
    /// This is a programming error and is always surfaced by
    /// `get_or_compute`.
    InvalidKey(String),

    /// Serialization failed when converting a value to its stored text.
    SerializationError(String),

    /// Deserialization failed when converting stored text back to a value.
    ///
    /// Common causes:
    /// - Stored text was written for a different Rust type
    /// - Payload was truncated or corrupted by the store
    ///
    /// **Recovery:** the facade treats the entry as absent and recomputes.
    DeserializationError(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// Returned when the stored text was not produced by this crate's
    /// codecs (another writer shares the key space, or the data is damaged).
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// Expected during deployments that bump
    /// [`CURRENT_SCHEMA_VERSION`](crate::serialization::CURRENT_SCHEMA_VERSION).
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Backend storage error (Redis, in-memory limits, etc).
    ///
    /// Common causes:
    /// - Redis connection lost
    /// - Network timeout
    /// - Memory store size limit reached
    BackendError(String),

    /// Configuration error during construction.
    ///
    /// Raised immediately and never isolated.
    ConfigError(String),

    /// The caller-supplied compute function failed.
    ///
    /// Every caller that waited on the same in-flight computation receives
    /// the same underlying error. Use [`std::error::Error::source`] to reach
    /// and downcast it.
    Compute(ComputeError),

    /// The caller stopped waiting because its cancellation token fired.
    Cancelled,

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Wrap a compute function's error.
    pub fn compute<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = error.into();
        Error::Compute(Arc::from(boxed))
    }

    /// Whether this error comes from the cache machinery itself (store or
    /// serializer), i.e. the kind the facade isolates from its callers.
    pub fn is_cache_failure(&self) -> bool {
        matches!(
            self,
            Error::SerializationError(_)
                | Error::DeserializationError(_)
                | Error::InvalidCacheEntry(_)
                | Error::VersionMismatch { .. }
                | Error::BackendError(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Compute(source) => write!(f, "Compute function failed: {}", source),
            Error::Cancelled => write!(f, "Cache operation cancelled"),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compute(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_eof() || e.is_data() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
