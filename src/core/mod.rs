/// Core Module for connscope
///
/// This module contains the fundamental components of the library. It
/// provides shared infrastructure for context identity, the pool contract,
/// the connection scope itself, and error handling.

pub mod context;
pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use context::ContextId;
pub use error::{BoxError, HandleOp, Result, ScopeError};
