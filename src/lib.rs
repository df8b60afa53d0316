//! # typed-cache
//!
//! A typed cache-aside facade over string key-value stores.
//!
//! ## Features
//!
//! - **Typed:** Read and write any serde type by logical key; a stored zero
//!   value is distinguishable from a miss
//! - **Single-flight:** Concurrent misses on one key within a process run the
//!   compute function once and share its result
//! - **Failure isolation:** Store and codec failures are logged and degrade
//!   to a miss or no-op; only your compute function's errors reach you
//! - **Backend agnostic:** In-memory and Redis stores, or any custom
//!   [`CacheBackend`]
//! - **Blocking or async:** [`TypedCache`] for async code, [`blocking::TypedCache`]
//!   for synchronous callers
//!
//! ## Quick Start
//!
//! ```rust
//! use typed_cache::{TypedCache, CacheConfig, backend::InMemoryBackend};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn load_user_from_db(id: u64) -> std::io::Result<User> {
//! #     Ok(User { id, name: "B".into() })
//! # }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> typed_cache::Result<()> {
//! let cache = TypedCache::new(InMemoryBackend::new(), CacheConfig::new("accounts_"));
//!
//! // Plain reads and writes never fail
//! cache.set("user:1", &User { id: 1, name: "A".into() }, Duration::from_secs(30)).await;
//! let user: Option<User> = cache.get("user:1").await;
//! assert_eq!(user.map(|u| u.name), Some("A".to_string()));
//!
//! // Cache-aside
//! let user: User = cache
//!     .get_or_compute("user:2", Duration::from_secs(30), || async {
//!         load_user_from_db(2).await
//!     })
//!     .await?;
//! assert_eq!(user.id, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Choosing a store from configuration
//!
//! ```no_run
//! use typed_cache::{TypedCache, CacheConfig, StorageConfig, backend::AnyBackend};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> typed_cache::Result<()> {
//! let backend = AnyBackend::from_config(&StorageConfig::default()).await?;
//! let cache = TypedCache::new(backend, CacheConfig::from_env()?);
//! # Ok(())
//! # }
//! ```
//!
//! Runnable programs live in `demos/` (`cargo run --example basic_usage`).

#[macro_use]
extern crate log;

pub mod backend;
pub mod blocking;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod observability;
pub mod serialization;
pub mod single_flight;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use cache::{NoCompute, OperationConfig, TypedCache};
pub use config::{CacheConfig, StorageConfig};
pub use error::{Error, Result};
pub use key::KeyBuilder;
pub use serialization::{Codec, JsonCodec, PostcardCodec};
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
