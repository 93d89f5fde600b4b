//! SQLite-backed pool provider and connection handle.
//!
//! `SqlitePool` is the concrete [`PoolProvider`](crate::core::db::pool::PoolProvider)
//! used by default: it opens one `rusqlite` connection per request and wraps
//! it in a [`SqliteHandle`]. SQLite has no auto-commit flag to toggle, so the
//! handle maps manual transaction mode onto explicit BEGIN/COMMIT statements
//! and reports the connection's native auto-commit state back.
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::core::db::pool::{ConnectionHandle, PoolProvider};
use crate::core::{HandleOp, Result, ScopeError};

/// A single SQLite connection owned on behalf of one execution context.
///
/// The connection lives behind a mutex holding an `Option` so that close can
/// consume it; any call after close fails with a handle-operation error, as
/// the scope contract requires.
pub struct SqliteHandle {
    conn: Mutex<Option<Connection>>,
}

impl SqliteHandle {
    pub fn new(conn: Connection) -> Self {
        SqliteHandle {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| ScopeError::App("connection handle lock poisoned".to_string()))
    }

    fn with_conn<T>(
        &self,
        op: HandleOp,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let guard = self.guard()?;
        match guard.as_ref() {
            Some(conn) => f(conn).map_err(|e| ScopeError::handle(op, e)),
            None => Err(ScopeError::handle(op, "connection handle is closed")),
        }
    }

    /// Executes a single SQL statement on this connection.
    ///
    /// This is the seam for the data-access code built on top of the scope;
    /// the scope itself never issues SQL.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.with_conn(HandleOp::Execute, |conn| conn.execute(sql, []))
    }

    /// Runs a query returning a single integer, for result checks.
    pub fn query_count(&self, sql: &str) -> Result<i64> {
        self.with_conn(HandleOp::Query, |conn| conn.query_row(sql, [], |row| row.get(0)))
    }
}

impl ConnectionHandle for SqliteHandle {
    /// Commits the open transaction. SQLite rejects this in auto-commit
    /// mode ("cannot commit - no transaction is active") and that rejection
    /// is surfaced verbatim.
    fn commit(&self) -> Result<()> {
        self.with_conn(HandleOp::Commit, |conn| conn.execute_batch("COMMIT"))
    }

    fn rollback(&self) -> Result<()> {
        self.with_conn(HandleOp::Rollback, |conn| conn.execute_batch("ROLLBACK"))
    }

    /// Maps the auto-commit flag onto SQLite's transaction model: disabling
    /// auto-commit opens a deferred transaction, re-enabling it commits the
    /// one that is open. Redundant toggles are no-ops.
    fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        self.with_conn(HandleOp::SetAutoCommit, |conn| {
            if !enabled && conn.is_autocommit() {
                conn.execute_batch("BEGIN")
            } else if enabled && !conn.is_autocommit() {
                conn.execute_batch("COMMIT")
            } else {
                Ok(())
            }
        })
    }

    fn auto_commit(&self) -> Result<bool> {
        self.with_conn(HandleOp::GetAutoCommit, |conn| Ok(conn.is_autocommit()))
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.guard()?;
        match guard.take() {
            Some(conn) => conn
                .close()
                .map_err(|(_, e)| ScopeError::handle(HandleOp::Close, e)),
            None => Err(ScopeError::handle(
                HandleOp::Close,
                "connection handle is closed",
            )),
        }
    }
}

/// Pool provider over a SQLite database file (or `:memory:`).
///
/// Each `get_connection` call opens a fresh connection; SQLite needs no
/// server-side pooling, so "the pool" is simply the database file itself.
pub struct SqlitePool {
    path: PathBuf,
}

impl SqlitePool {
    /// Creates a provider for the database at `db_path`.
    ///
    /// Use `":memory:"` for an in-memory database; note that every handle
    /// then gets its own private database.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        SqlitePool {
            path: db_path.into(),
        }
    }

    /// Builds a provider from a loaded database configuration.
    ///
    /// The configured driver must be `"sqlite"`; a `sqlite:` URL prefix is
    /// accepted and stripped.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.driver != "sqlite" {
            return Err(ScopeError::Config(format!(
                "unsupported driver '{}', expected 'sqlite'",
                config.driver
            )));
        }
        let path = config
            .url
            .strip_prefix("sqlite:")
            .unwrap_or(&config.url)
            .to_string();
        if path.is_empty() {
            return Err(ScopeError::Config("empty database url".to_string()));
        }
        Ok(SqlitePool::new(path))
    }

    /// Opens a connection and returns it as a concrete handle.
    pub fn open_handle(&self) -> Result<Arc<SqliteHandle>> {
        let conn = Connection::open(&self.path)
            .map_err(|e| ScopeError::Acquisition(Box::new(e)))?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(|e| ScopeError::Acquisition(Box::new(e)))?;
        debug!(path = ?self.path, "opened sqlite connection");
        Ok(Arc::new(SqliteHandle::new(conn)))
    }
}

impl PoolProvider for SqlitePool {
    fn get_connection(&self) -> Result<Arc<dyn ConnectionHandle>> {
        Ok(self.open_handle()?)
    }
}
