//! Cache key namespacing.

use crate::error::{Error, Result};

/// Builds namespaced store keys from logical keys.
///
/// The namespaced key is always `prefix + logical_key`, with no separator
/// inserted; put one at the end of the prefix if you want it (`"billing:"`).
/// Identical input always produces the identical store key, which is what
/// makes hits possible across calls and processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Create a builder for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        KeyBuilder {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the namespaced store key for `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if `key` is empty.
    pub fn build(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidKey("cache key must not be empty".to_string()));
        }

        let mut namespaced = String::with_capacity(self.prefix.len() + key.len());
        namespaced.push_str(&self.prefix);
        namespaced.push_str(key);
        Ok(namespaced)
    }
}
