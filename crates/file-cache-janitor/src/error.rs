//! Error types for the file cache janitor

use std::fmt;

#[derive(Debug)]
pub enum JanitorError {
    Cache(file_cache::CacheError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JanitorError::Cache(err) => write!(f, "Cache error: {}", err),
            JanitorError::Io(err) => write!(f, "IO error: {}", err),
            JanitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for JanitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JanitorError::Cache(err) => Some(err),
            JanitorError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<file_cache::CacheError> for JanitorError {
    fn from(err: file_cache::CacheError) -> Self {
        JanitorError::Cache(err)
    }
}

impl From<std::io::Error> for JanitorError {
    fn from(err: std::io::Error) -> Self {
        JanitorError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for JanitorError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        JanitorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JanitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = JanitorError::Config("missing FILE_CACHE_DIR".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: missing FILE_CACHE_DIR"
        );
    }

    #[test]
    fn test_cache_error_display() {
        let err: JanitorError =
            file_cache::CacheError::Config("cleanup interval must be non-zero".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Cache error: Configuration error: cleanup interval must be non-zero"
        );
    }

    #[test]
    fn test_error_is_debug() {
        let err: JanitorError = std::io::Error::new(std::io::ErrorKind::Other, "denied").into();
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Io"));
    }
}
