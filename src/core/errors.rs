// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The main error enum, representing all possible failures within the service.
#[derive(Error, Debug)]
pub enum BloomGuardError {
    /// One or more configuration values are invalid. Fatal at startup.
    #[error("configuration validation failed:\n- {}", .0.join("\n- "))]
    ConfigValidation(Vec<String>),

    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// The snapshot content does not have the expected structure.
    #[error("Snapshot decode error: {0}")]
    Decode(String),

    #[error("Snapshot write timed out after {0:?}")]
    SaveTimeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl BloomGuardError {
    /// True if this is an I/O error caused by a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BloomGuardError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
// We wrap it in an Arc to allow for cheap, shared cloning.
impl Clone for BloomGuardError {
    fn clone(&self) -> Self {
        match self {
            BloomGuardError::ConfigValidation(v) => BloomGuardError::ConfigValidation(v.clone()),
            BloomGuardError::Io(e) => BloomGuardError::Io(Arc::clone(e)),
            BloomGuardError::Decode(s) => BloomGuardError::Decode(s.clone()),
            BloomGuardError::SaveTimeout(d) => BloomGuardError::SaveTimeout(*d),
            BloomGuardError::InvalidRequest(s) => BloomGuardError::InvalidRequest(s.clone()),
            BloomGuardError::Internal(s) => BloomGuardError::Internal(s.clone()),
        }
    }
}

impl PartialEq for BloomGuardError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BloomGuardError::ConfigValidation(v1), BloomGuardError::ConfigValidation(v2)) => {
                v1 == v2
            }
            (BloomGuardError::Io(e1), BloomGuardError::Io(e2)) => e1.kind() == e2.kind(),
            (BloomGuardError::Decode(s1), BloomGuardError::Decode(s2)) => s1 == s2,
            (BloomGuardError::SaveTimeout(d1), BloomGuardError::SaveTimeout(d2)) => d1 == d2,
            (BloomGuardError::InvalidRequest(s1), BloomGuardError::InvalidRequest(s2)) => s1 == s2,
            (BloomGuardError::Internal(s1), BloomGuardError::Internal(s2)) => s1 == s2,
            _ => false,
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for BloomGuardError {
    fn from(e: std::io::Error) -> Self {
        BloomGuardError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for BloomGuardError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            BloomGuardError::Io(Arc::new(e.into()))
        } else {
            BloomGuardError::Decode(e.to_string())
        }
    }
}
