//! Relay Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Relay workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `RelayError` and the `Result` alias
//! - **Checksums**: SHA-256 digests for archived payloads
//! - **Types**: serialization naming policy
//! - **Logging**: tracing subscriber setup shared by all binaries
//!
//! # Example
//!
//! ```no_run
//! use relay_common::checksum::compute_bytes_checksum;
//!
//! let digest = compute_bytes_checksum(b"1,John,Doe");
//! assert_eq!(digest.len(), 64);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{RelayError, Result};
