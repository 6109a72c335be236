//! Error types for the attendance core.
//!
//! Caller errors (validation, unresolvable address) are rejected before any
//! storage is touched. Document store failures are the only storage errors
//! that fail a submission; tabular store failures are absorbed by the
//! persistence coordinator and surface as a degraded-mode flag.

use thiserror::Error;

/// Error type for the attendance core.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unable to determine the client address from the request")]
    AddressUnresolvable,
    #[error("Tabular store write failed: {0}")]
    TabularStoreWrite(String),
    #[error("Tabular store unreadable: {0}")]
    TabularStoreRead(String),
    #[error("Document store failure: {0}")]
    DocumentStore(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl AttendanceError {
    /// True when the error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AttendanceError::Validation(_) | AttendanceError::AddressUnresolvable
        )
    }
}

impl From<std::io::Error> for AttendanceError {
    fn from(e: std::io::Error) -> Self {
        AttendanceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AttendanceError {
    fn from(e: serde_json::Error) -> Self {
        AttendanceError::Serde(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AttendanceError {
    fn from(e: tokio::task::JoinError) -> Self {
        AttendanceError::Io(format!("blocking task failed: {}", e))
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(AttendanceError::Validation("identity".into()).is_client_error());
        assert!(AttendanceError::AddressUnresolvable.is_client_error());
        assert!(!AttendanceError::DocumentStore("disk full".into()).is_client_error());
        assert!(!AttendanceError::TabularStoreWrite("locked".into()).is_client_error());
    }
}
