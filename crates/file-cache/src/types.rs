//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// File suffix appended to a key's fingerprint, e.g. `".pdf"`
pub enum Extension<K> {
    Fixed(String),
    PerKey(Arc<dyn Fn(&K) -> String + Send + Sync>),
}

impl<K> Extension<K> {
    pub fn per_key<F>(resolve: F) -> Self
    where
        F: Fn(&K) -> String + Send + Sync + 'static,
    {
        Extension::PerKey(Arc::new(resolve))
    }

    pub fn resolve(&self, key: &K) -> String {
        match self {
            Extension::Fixed(ext) => ext.clone(),
            Extension::PerKey(resolve) => resolve(key),
        }
    }
}

impl<K> Clone for Extension<K> {
    fn clone(&self) -> Self {
        match self {
            Extension::Fixed(ext) => Extension::Fixed(ext.clone()),
            Extension::PerKey(resolve) => Extension::PerKey(Arc::clone(resolve)),
        }
    }
}

impl<K> fmt::Debug for Extension<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Fixed(ext) => f.debug_tuple("Fixed").field(ext).finish(),
            Extension::PerKey(_) => f.write_str("PerKey(..)"),
        }
    }
}

impl<K> From<&str> for Extension<K> {
    fn from(ext: &str) -> Self {
        Extension::Fixed(ext.to_string())
    }
}

impl<K> From<String> for Extension<K> {
    fn from(ext: String) -> Self {
        Extension::Fixed(ext)
    }
}

/// Outcome of a single sweep over the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Regular, non-hidden files inspected
    pub scanned: usize,
    /// Expired files deleted
    pub removed: usize,
    /// Files that could not be inspected or deleted
    pub failed: usize,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that started a generation
    pub misses: u64,
    pub generations: u64,
    pub generation_failures: u64,
    /// Callers that waited on another caller's in-flight generation
    pub dedup_joins: u64,
    pub sweeps: u64,
    pub swept_files: u64,
    /// Generations in flight right now
    pub pending: usize,
    pub last_sweep_at: Option<DateTime<Utc>>,
}
