//! Error types for the Flipchain engine
//!
//! This module defines the error types used throughout the engine,
//! covering bootstrap, per-frame GPU operations, synchronization and
//! geometry uploads.

use std::fmt;

/// Result type for Flipchain engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Flipchain engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error without a more precise classification
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Caller handed in data that violates a resource contract
    /// (empty vertex data, missing index data, unsupported index format...)
    InvalidResource(String),

    /// Operation not allowed in the current renderer state
    InvalidState(String),

    /// A bootstrap step failed. Fatal: the renderer is not constructed.
    InitializationFailed {
        /// Name of the failing bootstrap step ("device", "swapchain", ...)
        step: &'static str,
        /// Native error code reported by the backend (0 when not applicable)
        code: i32,
        /// Human readable description
        message: String,
    },

    /// A runtime GPU API call failed with a native error code
    OperationFailed {
        /// Operation that failed ("submit", "present", "reset", ...)
        operation: &'static str,
        /// Native error code reported by the backend
        code: i32,
    },

    /// The device was removed or reset while executing `operation`
    DeviceLost {
        operation: &'static str,
    },

    /// Bounded fence wait expired before the GPU reached `value`
    FenceTimeout {
        value: u64,
        completed: u64,
    },
}

impl Error {
    /// Native backend error code carried by this error, if any
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Error::InitializationFailed { code, .. } if *code != 0 => Some(*code),
            Error::OperationFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the renderer must stop producing frames after this error
    ///
    /// Caller contract violations leave the renderer usable, everything
    /// coming from the GPU does not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::InvalidResource(_) | Error::InvalidState(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::InitializationFailed { step, code, message } => write!(
                f,
                "Initialization failed at step '{}' (code {}): {}",
                step, code, message
            ),
            Error::OperationFailed { operation, code } => {
                write!(f, "Operation '{}' failed (code {})", operation, code)
            }
            Error::DeviceLost { operation } => write!(f, "Device lost during '{}'", operation),
            Error::FenceTimeout { value, completed } => write!(
                f,
                "Fence wait for value {} timed out (completed: {})",
                value, completed
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
