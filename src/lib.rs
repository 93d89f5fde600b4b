// Core infrastructure modules
pub mod core;

// Collaborator-facing modules
pub mod config;
pub mod sqlite;

pub use crate::core::db::pool::{ConnectionHandle, PoolProvider};
pub use crate::core::db::scope::ConnectionScope;
pub use crate::core::{ContextId, Result, ScopeError};
