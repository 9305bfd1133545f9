//! Cache configuration

use crate::error::{CacheError, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_DIR: &str = "./cache/files";
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Configuration for a [`FileCache`](crate::FileCache) or standalone [`Sweeper`](crate::Sweeper)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding generated files; created if absent
    pub cache_dir: PathBuf,
    /// Age after which a file is expired. Zero makes every lookup a miss.
    pub ttl: Duration,
    /// Period between sweeps
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Load configuration from `FILE_CACHE_DIR`, `FILE_CACHE_TTL_MS` and
    /// `FILE_CACHE_CLEANUP_INTERVAL_MS`, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let cache_dir = lookup("FILE_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let ttl = match lookup("FILE_CACHE_TTL_MS") {
            Some(raw) => parse_millis("FILE_CACHE_TTL_MS", &raw)?,
            None => defaults.ttl,
        };

        let cleanup_interval = match lookup("FILE_CACHE_CLEANUP_INTERVAL_MS") {
            Some(raw) => parse_millis("FILE_CACHE_CLEANUP_INTERVAL_MS", &raw)?,
            None => defaults.cleanup_interval,
        };

        let config = Self {
            cache_dir,
            ttl,
            cleanup_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::Config(
                "cleanup interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| CacheError::Config(format!("invalid {}={:?}: {}", name, raw, e)))
}
