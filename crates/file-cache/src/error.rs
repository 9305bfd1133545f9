//! Error types for the file cache

use key_fingerprint::FingerprintError;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by generators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cache errors are `Clone` so a single generation outcome can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone)]
pub enum CacheError {
    Serialization(String),
    Generation(Arc<dyn std::error::Error + Send + Sync>),
    Io(Arc<std::io::Error>),
    Config(String),
}

impl CacheError {
    pub(crate) fn generation(err: BoxError) -> Self {
        CacheError::Generation(Arc::from(err))
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, CacheError::Generation(_))
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            CacheError::Generation(err) => write!(f, "Generation error: {}", err),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Generation(err) => Some(err.as_ref()),
            CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<FingerprintError> for CacheError {
    fn from(err: FingerprintError) -> Self {
        match err {
            FingerprintError::Serialization(msg) => CacheError::Serialization(msg),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
