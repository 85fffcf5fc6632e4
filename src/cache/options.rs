//! Options shared by every adapter.

use crate::cache::CacheConfig;

/// TTL applied when neither the caller nor the configuration gives one.
pub const DEFAULT_TTL_SECONDS: u64 = 86400;

/// Enable flag and default TTL, normalized once at construction.
///
/// Adapters hold one of these instead of re-implementing the fallback rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    enabled: bool,
    default_ttl: u64,
}

impl AdapterOptions {
    /// A zero `default_ttl` is normalized to [`DEFAULT_TTL_SECONDS`].
    pub fn new(enabled: bool, default_ttl: u64) -> Self {
        let default_ttl = if default_ttl == 0 {
            DEFAULT_TTL_SECONDS
        } else {
            default_ttl
        };
        Self {
            enabled,
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.enabled, config.ttl_seconds)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Resolve a per-call TTL: zero means the adapter default.
    pub fn ttl(&self, ttl_seconds: u64) -> u64 {
        if ttl_seconds == 0 {
            self.default_ttl
        } else {
            ttl_seconds
        }
    }
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self::new(true, DEFAULT_TTL_SECONDS)
    }
}
