//! Cache adapters behind one contract.
//!
//! This module provides a unified caching interface that supports:
//! - File cache (one file per key in a local directory)
//! - Memcached cache (distributed, network-based)
//!
//! # Configuration
//!
//! Configure caching in your TOML config file:
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 86400
//! backend = "file"  # or "memcached"
//!
//! [cache.file]
//! directory = "cache"
//!
//! [cache.memcached]
//! pool_size = 1
//! compression = false
//! consistent_hashing = false
//! timeout_seconds = 5
//! key_prefix = "fusion"
//!
//! [[cache.memcached.servers]]
//! host = "127.0.0.1"
//! port = 11211
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let cache = CacheManager::new(settings.cache).await?;
//! cache.set("room:7", &room, 0).await?;
//! let item = cache.get::<Room>("room:7").await?;
//! if item.is_found() { /* ... */ }
//! ```

mod error;
mod file;
mod item;
mod manager;
mod memcached;
mod options;
mod traits;

pub use error::CacheError;
pub use file::FileAdapter;
pub use item::CacheItem;
pub use manager::{CacheManager, get_cache, init_cache};
pub use memcached::{MemcachedAdapter, MemcachedClient, Response};
pub use options::{AdapterOptions, DEFAULT_TTL_SECONDS};
pub use traits::CacheAdapter;

// Re-export config types
pub use crate::config::settings::{
    CacheBackend, CacheConfig, FileCacheConfig, MemcachedCacheConfig, MemcachedServer,
};
