//! Error types for key fingerprinting

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    Serialization(String),
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintError::Serialization(msg) => {
                write!(f, "Key serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for FingerprintError {}

impl From<serde_json::Error> for FingerprintError {
    fn from(err: serde_json::Error) -> Self {
        FingerprintError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
