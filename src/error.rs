//! Error types for the calcpad sandbox.
//!
//! Faults raised by individual lines are not errors at this level: they are
//! rendered into that line's result string (see [`crate::interp::EvalError`]).
//! A [`SandboxError`] means the request as a whole could not be served.

use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The batch exceeded the configured timeout and its worker did not stop.
    #[error("execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The request was structurally invalid and was rejected before running.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The worker running a batch failed without producing results.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Failed to start the worker thread.
    #[error("failed to initialize runtime: {0}")]
    RuntimeInit(#[source] anyhow::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SandboxError {
    /// Check if this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SandboxError::Timeout(_))
    }

    /// Check if this error represents a rejected request.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, SandboxError::InvalidRequest(_))
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SandboxError::InvalidRequest(_) | SandboxError::Config(_))
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
