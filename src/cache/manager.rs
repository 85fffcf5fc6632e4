//! Cache manager that dispatches to the configured adapter.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::cache::file::FileAdapter;
use crate::cache::memcached::MemcachedAdapter;
use crate::cache::{AdapterOptions, CacheAdapter, CacheBackend, CacheConfig, CacheError, CacheItem};

/// Global cache manager instance.
static CACHE: OnceCell<CacheManager> = OnceCell::const_new();

/// Initialize the global cache manager.
///
/// This should be called once during application startup.
/// Subsequent calls will return the existing instance.
pub async fn init_cache(config: CacheConfig) -> Result<&'static CacheManager, CacheError> {
    CACHE
        .get_or_try_init(|| async { CacheManager::new(config).await })
        .await
}

/// Get the global cache manager.
///
/// Returns `None` if the cache has not been initialized.
pub fn get_cache() -> Option<&'static CacheManager> {
    CACHE.get()
}

/// Front door to the configured cache adapter.
///
/// Values passed through [`get`](Self::get) and [`set`](Self::set) are
/// stored as JSON; the `_raw` variants pass bytes through untouched.
#[derive(Clone)]
pub struct CacheManager {
    adapter: Arc<dyn CacheAdapter>,
    config: CacheConfig,
}

impl CacheManager {
    /// Build the adapter selected by `config.backend` and connect it.
    ///
    /// A disabled cache still builds and connects its adapter; the adapter
    /// itself turns reads and writes into no-ops, and a disabled memcached
    /// adapter does not reach its servers until `remove` or `clear`.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let options = AdapterOptions::from_config(&config);
        let adapter: Arc<dyn CacheAdapter> = match config.backend {
            CacheBackend::File => Arc::new(FileAdapter::new(&config.file, options)),
            CacheBackend::Memcached => Arc::new(MemcachedAdapter::new(&config.memcached, options)),
        };
        Self::with_adapter(adapter, config).await
    }

    /// Wrap an already built adapter and connect it.
    pub async fn with_adapter(
        adapter: Arc<dyn CacheAdapter>,
        config: CacheConfig,
    ) -> Result<Self, CacheError> {
        adapter.connect().await?;
        Ok(Self { adapter, config })
    }

    /// Get a reference to the cache adapter.
    pub fn adapter(&self) -> &Arc<dyn CacheAdapter> {
        &self.adapter
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Check if caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.adapter.options().is_enabled()
    }

    /// Look up `key` and decode the stored JSON into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<CacheItem<T>, CacheError> {
        self.adapter.get(key).await?.decode()
    }

    /// Encode `value` as JSON and store it under `key`.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<bool, CacheError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.adapter.set(key, bytes, ttl_seconds).await
    }

    // ========================================================================
    // CacheAdapter proxy methods
    // ========================================================================

    pub async fn get_raw(&self, key: &str) -> Result<CacheItem, CacheError> {
        self.adapter.get(key).await
    }

    pub async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: u64,
    ) -> Result<bool, CacheError> {
        self.adapter.set(key, value, ttl_seconds).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.adapter.remove(key).await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.adapter.clear().await
    }

    /// Run the adapter's expiry sweep, if it has one.
    pub async fn remove_expired(&self) -> Result<usize, CacheError> {
        self.adapter.remove_expired().await
    }
}
