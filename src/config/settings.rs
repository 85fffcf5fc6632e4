//! Configuration settings structures for fusion-cache
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TTL_SECONDS;
use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_path() -> String {
    "logs/cache.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_cache_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

fn default_cache_directory() -> String {
    "cache".to_string()
}

fn default_memcached_servers() -> Vec<MemcachedServer> {
    vec![MemcachedServer::default()]
}

fn default_memcached_host() -> String {
    "127.0.0.1".to_string()
}

fn default_memcached_port() -> u16 {
    11211
}

fn default_memcached_pool_size() -> u32 {
    1
}

fn default_memcached_timeout() -> u64 {
    5
}

// ============================================================================
// Logger Settings (compatible with LoggerConfig)
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger settings as they appear in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to LoggerConfig
    ///
    /// This method transforms the configuration file representation into
    /// the runtime LoggerConfig used by the logger module.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(
            |e| ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            },
        )
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    File,
    Memcached,
}

/// File cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCacheConfig {
    /// Directory holding one file per cache key
    #[serde(default = "default_cache_directory", alias = "cache_folder")]
    pub directory: String,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
        }
    }
}

/// A single memcached server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemcachedServer {
    #[serde(default = "default_memcached_host")]
    pub host: String,

    #[serde(default = "default_memcached_port")]
    pub port: u16,
}

impl Default for MemcachedServer {
    fn default() -> Self {
        Self {
            host: default_memcached_host(),
            port: default_memcached_port(),
        }
    }
}

/// Memcached cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemcachedCacheConfig {
    /// Server pool, in routing order
    #[serde(default = "default_memcached_servers", alias = "memcached_servers")]
    pub servers: Vec<MemcachedServer>,

    /// Connections kept per server
    #[serde(default = "default_memcached_pool_size", alias = "memcached_pool")]
    pub pool_size: u32,

    /// Compress values before storing them
    #[serde(default, alias = "memcached_compression")]
    pub compression: bool,

    /// Route keys with a process-independent hash
    #[serde(default)]
    pub consistent_hashing: bool,

    /// Read/write timeout in seconds
    #[serde(default = "default_memcached_timeout")]
    pub timeout_seconds: u64,

    /// Key prefix for all cache entries
    #[serde(default)]
    pub key_prefix: String,
}

impl Default for MemcachedCacheConfig {
    fn default() -> Self {
        Self {
            servers: default_memcached_servers(),
            pool_size: default_memcached_pool_size(),
            compression: false,
            consistent_hashing: false,
            timeout_seconds: default_memcached_timeout(),
            key_prefix: String::new(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default, alias = "cache_enabled", alias = "cache_service")]
    pub enabled: bool,

    /// Default time-to-live in seconds; zero falls back to one day
    #[serde(default = "default_cache_ttl", alias = "cache_time")]
    pub ttl_seconds: u64,

    /// Cache backend type
    #[serde(default)]
    pub backend: CacheBackend,

    /// File cache settings
    #[serde(default)]
    pub file: FileCacheConfig,

    /// Memcached cache settings
    #[serde(default)]
    pub memcached: MemcachedCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_cache_ttl(),
            backend: CacheBackend::default(),
            file: FileCacheConfig::default(),
            memcached: MemcachedCacheConfig::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete library settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.ttl_seconds, 86400);
        assert_eq!(config.backend, CacheBackend::File);
        assert_eq!(config.file.directory, "cache");
        assert_eq!(config.memcached.servers.len(), 1);
        assert_eq!(config.memcached.pool_size, 1);
    }

    #[test]
    fn test_cache_config_from_toml() {
        let config: CacheConfig = toml::from_str(
            r#"
enabled = true
ttl_seconds = 600
backend = "memcached"

[memcached]
compression = true
consistent_hashing = true
key_prefix = "app"

[[memcached.servers]]
host = "10.0.0.1"
port = 11211

[[memcached.servers]]
host = "10.0.0.2"
"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.ttl_seconds, 600);
        assert_eq!(config.backend, CacheBackend::Memcached);
        assert!(config.memcached.compression);
        assert!(config.memcached.consistent_hashing);
        assert_eq!(config.memcached.key_prefix, "app");
        assert_eq!(config.memcached.servers.len(), 2);
        assert_eq!(config.memcached.servers[1].host, "10.0.0.2");
        assert_eq!(config.memcached.servers[1].port, 11211);
    }

    #[test]
    fn test_cache_config_legacy_option_names() {
        let config: CacheConfig = toml::from_str(
            r#"
cache_enabled = true
cache_time = 120

[file]
cache_folder = "/tmp/cache"

[memcached]
memcached_pool = 4
memcached_compression = true
memcached_servers = [{ host = "cache-1", port = 11311 }]
"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.ttl_seconds, 120);
        assert_eq!(config.file.directory, "/tmp/cache");
        assert_eq!(config.memcached.pool_size, 4);
        assert!(config.memcached.compression);
        assert_eq!(config.memcached.servers[0].port, 11311);
    }

    #[test]
    fn test_cache_service_enables_cache() {
        let config: CacheConfig = toml::from_str("cache_service = true").unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn test_logger_settings_into_config() {
        let settings = LoggerSettings {
            level: "debug".to_string(),
            ..Default::default()
        };
        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.file.format, LogFormat::Json);
    }

    #[test]
    fn test_logger_settings_bad_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = settings.into_logger_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "logger.file.format")
        );
    }

    fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (
            any::<bool>(),
            0u64..1_000_000,
            prop_oneof![Just(CacheBackend::File), Just(CacheBackend::Memcached)],
            "[a-z/]{1,20}",
            1u32..16,
        )
            .prop_map(|(enabled, ttl_seconds, backend, directory, pool_size)| CacheConfig {
                enabled,
                ttl_seconds,
                backend,
                file: FileCacheConfig { directory },
                memcached: MemcachedCacheConfig {
                    pool_size,
                    ..Default::default()
                },
            })
    }

    proptest! {
        #[test]
        fn property_settings_toml_round_trip(cache in arb_cache_config()) {
            let settings = Settings { cache, logger: LoggerSettings::default() };
            let serialized = toml::to_string(&settings).unwrap();
            let parsed: Settings = toml::from_str(&serialized).unwrap();
            prop_assert_eq!(parsed, settings);
        }
    }
}
