//! Error types for the Nova RHI
//!
//! This module defines the error types used throughout the RHI layer,
//! covering configuration, backend call failures, and precondition
//! violations. Creation APIs return `Result`; the embedding application
//! decides whether an error is fatal.

use std::fmt;

/// Result type for Nova RHI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nova RHI errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (a native graphics call failed)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (rejected descriptor, mismatched image type, etc.)
    InvalidResource(String),

    /// Precondition violation (recording on a closed command buffer,
    /// mapping a buffer without CPU access, out-of-bounds map range)
    InvalidOperation(String),

    /// Initialization failed (unknown backend name, device creation)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
