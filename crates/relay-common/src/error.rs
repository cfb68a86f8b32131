//! Error types for Relay

use thiserror::Error;

/// Result type alias for Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Main error type shared across Relay crates
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
