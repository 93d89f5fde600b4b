/// Pool Provider Contract
///
/// This module defines the interface boundary to the external connection
/// pool. The scope treats the pool as an opaque supplier of ready-to-use
/// connection handles; sizing, eviction, health checks and wait queues all
/// live behind [`PoolProvider`] and are out of scope here.
use std::sync::Arc;

use crate::core::Result;

/// A single live connection obtained from the pool.
///
/// A handle is exclusively used by one execution context at a time, by
/// construction: the scope never exposes a handle to more than one context.
/// Every operation may fail with a driver-defined error, which the scope
/// propagates unchanged. In particular a handle rejects misuse itself
/// (commit with no open transaction, any call after close); the scope does
/// no misuse detection of its own.
pub trait ConnectionHandle: Send + Sync {
    /// Commits the current transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the current transaction.
    fn rollback(&self) -> Result<()>;

    /// Enables or disables auto-commit.
    ///
    /// Disabling auto-commit opens a transaction; re-enabling it while a
    /// transaction is open commits that transaction, matching the behavior
    /// of the common driver contracts.
    fn set_auto_commit(&self, enabled: bool) -> Result<()>;

    /// Returns whether the connection is currently in auto-commit mode.
    fn auto_commit(&self) -> Result<bool>;

    /// Closes the connection, returning it to the pool for reclamation.
    ///
    /// The handle must not be used after close; subsequent calls fail.
    fn close(&self) -> Result<()>;
}

/// Supplier of pooled connection handles.
///
/// `get_connection` may block (waiting for a free pooled connection) or fail
/// (pool exhausted, connectivity). Cancellation and timeout policy, if any,
/// belongs to the provider; the scope neither retries nor times out.
pub trait PoolProvider: Send + Sync {
    fn get_connection(&self) -> Result<Arc<dyn ConnectionHandle>>;
}
