//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, FileSettings, LoggerSettings, MemcachedCacheConfig, Settings,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// Only the settings of the selected backend are checked.
    /// A `ttl_seconds` of zero is accepted and normalized by the adapters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            CacheBackend::File => {
                if self.file.directory.trim().is_empty() {
                    return Err(ConfigError::validation(
                        "cache.file.directory",
                        "Cache directory is required for the file backend.",
                    ));
                }
            }
            CacheBackend::Memcached => self.memcached.validate()?,
        }
        Ok(())
    }
}

impl MemcachedCacheConfig {
    /// Validate memcached configuration
    ///
    /// # Validation Rules
    /// - At least one server
    /// - Every server has a host and a non-zero port
    /// - Pool size must be greater than 0
    /// - Timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::validation(
                "cache.memcached.servers",
                "At least one memcached server is required.",
            ));
        }

        for (index, server) in self.servers.iter().enumerate() {
            if server.host.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    field: format!("cache.memcached.servers[{}].host", index),
                    message: "Server host must not be empty.".to_string(),
                });
            }
            if server.port == 0 {
                return Err(ConfigError::ValidationError {
                    field: format!("cache.memcached.servers[{}].port", index),
                    message: "Port must be between 1 and 65535.".to_string(),
                });
            }
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "cache.memcached.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.memcached.timeout_seconds",
                "Timeout must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
