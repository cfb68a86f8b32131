//! SHA-256 digests for archived payload verification

use crate::error::{RelayError, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of an in-memory buffer
pub fn compute_bytes_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify that `data` hashes to `expected` (case-insensitive hex)
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let actual = compute_bytes_checksum(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(RelayError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
