//! CacheAdapter trait definition.

use async_trait::async_trait;

use crate::cache::{AdapterOptions, CacheError, CacheItem};

/// Trait for cache backends.
///
/// All cache backends must implement this trait to provide a unified interface.
/// Values are opaque bytes at this level; typed access lives on
/// [`CacheManager`](crate::cache::CacheManager).
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Acquire backend resources. Calling it again is a no-op.
    async fn connect(&self) -> Result<(), CacheError>;

    /// Look up a key. A disabled adapter returns a miss without I/O.
    async fn get(&self, key: &str) -> Result<CacheItem, CacheError>;

    /// Store a value. A `ttl_seconds` of zero means the adapter default.
    ///
    /// Returns `false` when nothing was written (disabled cache, or a backend
    /// that refuses to overwrite).
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<bool, CacheError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry owned by this adapter.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Sweep entries older than the default TTL and return how many were removed.
    ///
    /// Backends that expire entries on their own keep this default.
    async fn remove_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    fn options(&self) -> &AdapterOptions;
}
