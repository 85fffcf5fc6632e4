//! Fusion-Cache Library
//!
//! Interchangeable cache backends (file, memcached) behind a single
//! `get`/`set`/`remove`/`clear` contract, with layered configuration and
//! `tracing`-based logging.

pub mod cache;
pub mod config;
pub mod logger;

pub use cache::{CacheAdapter, CacheError, CacheItem, CacheManager};
pub use config::{ConfigLoader, Settings};
