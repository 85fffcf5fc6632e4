//! Memcached cache implementation.
//!
//! The adapter talks to the pool through [`MemcachedClient`], which reduces
//! every backend reply to success, not-found, or failure. The `memcache`
//! crate provides the real client when the `memcached` feature is on.
//!
//! A disabled adapter does not open the pool on `connect`. `remove` and
//! `clear` still reach the servers, connecting on first use.
//!
//! With `compression` on, every stored value is expected to be zlib data. A
//! value written by an uncompressed client reads back as
//! [`CacheError::Serialization`] rather than a hit, so all writers sharing a
//! pool must agree on the setting.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{AdapterOptions, CacheAdapter, CacheError, CacheItem, MemcachedCacheConfig};
#[cfg(feature = "memcached")]
use crate::cache::MemcachedServer;

/// Longest key the memcached text protocol accepts.
const MAX_KEY_LENGTH: usize = 250;

/// Expirations above this many seconds are read by memcached as unix timestamps.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// Outcome of a single memcached call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<T> {
    Success(T),
    NotFound,
    /// Any other reply, with the backend's message.
    Failure(String),
}

/// Blocking memcached operations used by [`MemcachedAdapter`].
pub trait MemcachedClient: Send + Sync {
    fn get(&self, key: &str) -> Response<Vec<u8>>;

    fn set(&self, key: &str, value: &[u8], expiration: u32) -> Response<()>;

    fn delete(&self, key: &str) -> Response<()>;

    fn flush(&self) -> Response<()>;
}

type Connector =
    Arc<dyn Fn(&MemcachedCacheConfig) -> Result<Arc<dyn MemcachedClient>, CacheError> + Send + Sync>;

/// Memcached-backed cache adapter.
pub struct MemcachedAdapter {
    config: MemcachedCacheConfig,
    options: AdapterOptions,
    client: OnceCell<Arc<dyn MemcachedClient>>,
    connector: Connector,
}

impl MemcachedAdapter {
    /// Adapter using the `memcache` crate client.
    pub fn new(config: &MemcachedCacheConfig, options: AdapterOptions) -> Self {
        Self::with_connector(config, options, default_connector)
    }

    /// Adapter whose client is produced by `connector` on first `connect`.
    pub fn with_connector<F>(config: &MemcachedCacheConfig, options: AdapterOptions, connector: F) -> Self
    where
        F: Fn(&MemcachedCacheConfig) -> Result<Arc<dyn MemcachedClient>, CacheError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            config: config.clone(),
            options,
            client: OnceCell::new(),
            connector: Arc::new(connector),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    fn client(&self) -> Result<Arc<dyn MemcachedClient>, CacheError> {
        self.client.get().cloned().ok_or(CacheError::NotConnected)
    }

    /// Apply the key prefix and check memcached's key rules.
    fn backend_key(&self, key: &str) -> Result<String, CacheError> {
        if key.is_empty() {
            return Err(CacheError::invalid_key(key, "key must not be empty"));
        }
        let full = if self.config.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.config.key_prefix, key)
        };
        if full.len() > MAX_KEY_LENGTH {
            return Err(CacheError::invalid_key(
                key,
                format!("key exceeds {} bytes", MAX_KEY_LENGTH),
            ));
        }
        if full.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CacheError::invalid_key(
                key,
                "key must not contain whitespace or control characters",
            ));
        }
        Ok(full)
    }

    /// Build the client once; later calls reuse it.
    async fn establish(&self) -> Result<(), CacheError> {
        self.client
            .get_or_try_init(|| async {
                let connector = Arc::clone(&self.connector);
                let config = self.config.clone();
                let client = tokio::task::spawn_blocking(move || connector(&config))
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))??;
                info!(servers = self.config.servers.len(), "Memcached cache connected");
                Ok::<_, CacheError>(client)
            })
            .await?;
        Ok(())
    }

    /// Run a blocking client call on the blocking pool.
    async fn call<T, F>(&self, operation: &'static str, key: &str, f: F) -> Result<Response<T>, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MemcachedClient) -> Response<T> + Send + 'static,
    {
        let client = self.client()?;
        tokio::task::spawn_blocking(move || f(client.as_ref()))
            .await
            .map_err(|e| CacheError::backend(operation, key, e))
    }

    fn encode(&self, key: &str, value: Vec<u8>) -> Result<Vec<u8>, CacheError> {
        if !self.config.compression {
            return Ok(value);
        }
        let compress_err =
            |e: std::io::Error| CacheError::Serialization(format!("compress '{}': {}", key, e));
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&value).map_err(compress_err)?;
        encoder.finish().map_err(compress_err)
    }

    fn decode(&self, key: &str, value: Vec<u8>) -> Result<Vec<u8>, CacheError> {
        if !self.config.compression {
            return Ok(value);
        }
        let mut decoded = Vec::new();
        ZlibDecoder::new(value.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| CacheError::Serialization(format!("decompress '{}': {}", key, e)))?;
        Ok(decoded)
    }
}

/// Convert a TTL to memcached's expiration field.
fn expiration_for(ttl: u64) -> u32 {
    if ttl <= MAX_RELATIVE_EXPIRATION {
        return ttl as u32;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(now.saturating_add(ttl)).unwrap_or(u32::MAX)
}

#[async_trait]
impl CacheAdapter for MemcachedAdapter {
    async fn connect(&self) -> Result<(), CacheError> {
        if !self.options.is_enabled() {
            debug!("Memcached cache disabled, pool not opened");
            return Ok(());
        }
        self.establish().await
    }

    async fn get(&self, key: &str) -> Result<CacheItem, CacheError> {
        if !self.options.is_enabled() {
            return Ok(CacheItem::miss(key));
        }
        let full = self.backend_key(key)?;

        match self.call("get", key, move |c| c.get(&full)).await? {
            Response::Success(bytes) => {
                debug!(key, "Memcached hit");
                Ok(CacheItem::hit(key, self.decode(key, bytes)?))
            }
            Response::NotFound => {
                debug!(key, "Memcached miss");
                Ok(CacheItem::miss(key))
            }
            Response::Failure(message) => {
                warn!(key, error = %message, "Memcached get failed");
                Err(CacheError::backend("get", key, message))
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<bool, CacheError> {
        if !self.options.is_enabled() {
            return Ok(false);
        }
        let full = self.backend_key(key)?;
        let ttl = self.options.ttl(ttl_seconds);
        let expiration = expiration_for(ttl);
        let payload = self.encode(key, value)?;

        match self
            .call("set", key, move |c| c.set(&full, &payload, expiration))
            .await?
        {
            Response::Success(()) => {
                debug!(key, ttl, "Memcached stored");
                Ok(true)
            }
            Response::NotFound => Err(CacheError::backend("set", key, "value not stored")),
            Response::Failure(message) => {
                warn!(key, error = %message, "Memcached set failed");
                Err(CacheError::backend("set", key, message))
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let full = self.backend_key(key)?;
        if !self.options.is_enabled() {
            self.establish().await?;
        }
        match self.call("remove", key, move |c| c.delete(&full)).await? {
            Response::Success(()) | Response::NotFound => Ok(()),
            Response::Failure(message) => {
                warn!(key, error = %message, "Memcached delete failed");
                Err(CacheError::backend("remove", key, message))
            }
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        if !self.options.is_enabled() {
            self.establish().await?;
        }
        match self.call("clear", "*", |c| c.flush()).await? {
            Response::Success(()) | Response::NotFound => Ok(()),
            Response::Failure(message) => {
                warn!(error = %message, "Memcached flush failed");
                Err(CacheError::backend("clear", "*", message))
            }
        }
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }
}

#[cfg(feature = "memcached")]
fn default_connector(config: &MemcachedCacheConfig) -> Result<Arc<dyn MemcachedClient>, CacheError> {
    use std::time::Duration;

    if config.servers.is_empty() {
        return Err(CacheError::Connection(
            "no memcached servers configured".to_string(),
        ));
    }

    let urls: Vec<String> = config
        .servers
        .iter()
        .map(|server| server_url(server, config.timeout_seconds))
        .collect();

    let mut client = memcache::Client::with_pool_size(urls, config.pool_size)
        .map_err(|e| CacheError::Connection(e.to_string()))?;

    let timeout = Some(Duration::from_secs(config.timeout_seconds));
    client
        .set_read_timeout(timeout)
        .and_then(|_| client.set_write_timeout(timeout))
        .map_err(|e| CacheError::Connection(e.to_string()))?;

    if config.consistent_hashing {
        client.hash_function = fnv1a_hash;
    }

    Ok(Arc::new(client))
}

#[cfg(not(feature = "memcached"))]
fn default_connector(_config: &MemcachedCacheConfig) -> Result<Arc<dyn MemcachedClient>, CacheError> {
    Err(CacheError::Connection(
        "memcached support is not compiled in (enable the `memcached` feature)".to_string(),
    ))
}

/// Connection URL for one server; `connect_timeout` bounds the pool's
/// initial connection attempts.
#[cfg(feature = "memcached")]
fn server_url(server: &MemcachedServer, timeout_seconds: u64) -> String {
    format!(
        "memcache://{}:{}?connect_timeout={}",
        server.host, server.port, timeout_seconds
    )
}

/// Process-independent key hash, so every client picks the same server.
#[cfg(feature = "memcached")]
fn fnv1a_hash(key: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    key.bytes()
        .fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(feature = "memcached")]
impl MemcachedClient for memcache::Client {
    fn get(&self, key: &str) -> Response<Vec<u8>> {
        match memcache::Client::get::<Vec<u8>>(self, key) {
            Ok(Some(value)) => Response::Success(value),
            Ok(None) => Response::NotFound,
            Err(e) => Response::Failure(e.to_string()),
        }
    }

    fn set(&self, key: &str, value: &[u8], expiration: u32) -> Response<()> {
        match memcache::Client::set(self, key, value, expiration) {
            Ok(()) => Response::Success(()),
            Err(e) => Response::Failure(e.to_string()),
        }
    }

    fn delete(&self, key: &str) -> Response<()> {
        match memcache::Client::delete(self, key) {
            Ok(true) => Response::Success(()),
            Ok(false) => Response::NotFound,
            Err(e) => Response::Failure(e.to_string()),
        }
    }

    fn flush(&self) -> Response<()> {
        match memcache::Client::flush(self) {
            Ok(()) => Response::Success(()),
            Err(e) => Response::Failure(e.to_string()),
        }
    }
}
