/// Database Module
///
/// This module provides the core database functionality for connscope,
/// organized into focused submodules for better maintainability and
/// separation of concerns.
///
/// ## Architecture
///
/// The database layer is split into two concerns:
/// - **Pool Contract** (`pool.rs`): The interface boundary to the external
///   connection pool and its handles
/// - **Connection Scope** (`scope.rs`): Per-context binding, reuse, and
///   transaction control over bound handles
///
/// ## Error Handling
///
/// All database operations use the standardized `ScopeError` type for
/// consistent error propagation.
pub mod pool;
pub mod scope;

pub use pool::*;
pub use scope::*;
