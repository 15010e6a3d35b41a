//! # Relay Errors
//!
//! Error types for the relay module.

use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay errors
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    // ==================
    // Message Errors
    // ==================
    /// Inbound frame is not a JSON document
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    // ==================
    // Server Errors
    // ==================
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Listener could not bind
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// Handshake or transport failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RelayError::InvalidMessage("expected value".into());
        assert_eq!(err.to_string(), "Invalid message format: expected value");
    }
}
