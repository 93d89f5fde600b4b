/// Connscope Error Module
///
/// This module defines the error types for the connection scope library.
/// It provides structured error handling with proper error propagation:
/// provider and handle failures are carried as boxed sources so that the
/// underlying driver error reaches the caller unchanged.
use std::fmt;
use thiserror::Error;

/// Boxed source error from the pool provider or the underlying driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The handle operation that was being forwarded when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOp {
    Commit,
    Rollback,
    Close,
    SetAutoCommit,
    GetAutoCommit,
    Execute,
    Query,
}

impl fmt::Display for HandleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleOp::Commit => "commit",
            HandleOp::Rollback => "rollback",
            HandleOp::Close => "close",
            HandleOp::SetAutoCommit => "set auto-commit",
            HandleOp::GetAutoCommit => "get auto-commit",
            HandleOp::Execute => "execute",
            HandleOp::Query => "query",
        };
        f.write_str(name)
    }
}

/// Error type for the connection scope library.
///
/// This enum covers all failure scenarios the scope can surface:
/// - Acquisition failures from the pool provider
/// - Forwarded handle operations that the connection rejected
/// - Configuration loading and validation
/// - Internal invariant failures (poisoned registry lock, double install)
///
/// No variant is produced by retrying or swallowing a lower-level failure;
/// every error maps one-to-one to a call the caller made.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// The pool provider could not supply a connection handle
    /// (pool exhausted, connectivity). Never retried internally.
    #[error("Acquisition error: {0}")]
    Acquisition(#[source] BoxError),

    /// A commit/rollback/close/auto-commit call failed on a bound handle.
    #[error("Handle error during {op}: {source}")]
    Handle {
        op: HandleOp,
        #[source]
        source: BoxError,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic application errors for unexpected conditions
    #[error("Application error: {0}")]
    App(String),
}

impl ScopeError {
    /// Wraps a driver error as a failed forward of `op`.
    pub fn handle<E>(op: HandleOp, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        ScopeError::Handle {
            op,
            source: source.into(),
        }
    }
}

/// Type alias for Result to use ScopeError as the error type.
///
/// This provides a consistent error type across the entire library
/// instead of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, ScopeError>;
