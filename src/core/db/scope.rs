/// Connection Scope Module
///
/// This module provides the binding between execution contexts and pooled
/// connection handles: lazy acquisition on first use, transparent reuse on
/// every later call from the same context, and explicit
/// commit/rollback/auto-commit/close control over the bound handle.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::core::context::ContextId;
use crate::core::db::pool::{ConnectionHandle, PoolProvider};
use crate::core::{Result, ScopeError};

type Registry = HashMap<ContextId, Arc<dyn ConnectionHandle>>;

/// Process-wide scope instance, installed explicitly via [`install`].
static GLOBAL_SCOPE: OnceCell<ConnectionScope> = OnceCell::new();

/// Per-context connection registry.
///
/// The scope guarantees "acquire-once, reuse-until-closed" semantics: for any
/// context there is at most one live binding at a time, and no context can
/// observe or affect another context's handle through any operation. The
/// registry mutex only guards insert/remove/lookup; a bound handle is never
/// contended because exactly one context ever touches it.
pub struct ConnectionScope {
    provider: Arc<dyn PoolProvider>,
    bindings: Mutex<Registry>,
}

impl ConnectionScope {
    /// Creates a scope over the given pool provider.
    pub fn new(provider: Arc<dyn PoolProvider>) -> Self {
        ConnectionScope {
            provider,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    fn registry(&self) -> Result<MutexGuard<'_, Registry>> {
        self.bindings
            .lock()
            .map_err(|_| ScopeError::App("connection registry lock poisoned".to_string()))
    }

    /// Returns the connection bound to `ctx`, acquiring one from the pool
    /// provider on first use.
    ///
    /// Two consecutive calls with no intervening [`release`](Self::release)
    /// return the identical handle. A provider failure is surfaced as
    /// [`ScopeError::Acquisition`] with no binding created; retry policy
    /// belongs to the caller or the provider, never to the scope.
    pub fn acquire(&self, ctx: ContextId) -> Result<Arc<dyn ConnectionHandle>> {
        if let Some(handle) = self.registry()?.get(&ctx) {
            return Ok(Arc::clone(handle));
        }

        // The provider call may block waiting for a free pooled connection,
        // so it happens outside the registry lock. Only the owning context
        // acquires under its own id, so the check-then-insert cannot race
        // into a double binding.
        let handle = self.provider.get_connection()?;
        self.registry()?.insert(ctx, Arc::clone(&handle));
        debug!(context = ?ctx, "bound new pooled connection");
        Ok(handle)
    }

    /// Closes the connection bound to `ctx` and removes the binding.
    ///
    /// Equivalent to acquire-then-close: a context with no binding gets a
    /// fresh connection which is immediately closed. The binding is removed
    /// before the close outcome is known, so a failed close never strands
    /// the context; the next acquire starts fresh with a new handle either
    /// way, and the close failure is still surfaced to the caller.
    pub fn release(&self, ctx: ContextId) -> Result<()> {
        let handle = self.acquire(ctx)?;
        self.registry()?.remove(&ctx);
        debug!(context = ?ctx, "released pooled connection");
        handle.close()
    }

    /// Switches the bound connection between auto-commit and manual
    /// transaction mode, acquiring a connection if none is bound yet.
    ///
    /// `manual = true` disables auto-commit; commit and rollback become
    /// explicit operations the context must invoke.
    pub fn set_transaction_mode(&self, ctx: ContextId, manual: bool) -> Result<()> {
        self.acquire(ctx)?.set_auto_commit(!manual)
    }

    /// Returns whether the bound connection is in manual transaction mode.
    pub fn is_manual_transaction(&self, ctx: ContextId) -> Result<bool> {
        Ok(!self.acquire(ctx)?.auto_commit()?)
    }

    /// Commits the current transaction on the bound connection.
    ///
    /// Forwarded verbatim; if the connection is not in manual mode the
    /// driver's rejection is surfaced, not swallowed.
    pub fn commit(&self, ctx: ContextId) -> Result<()> {
        self.acquire(ctx)?.commit()
    }

    /// Rolls back the current transaction on the bound connection.
    pub fn rollback(&self, ctx: ContextId) -> Result<()> {
        self.acquire(ctx)?.rollback()
    }

    /// Reports whether `ctx` currently has a bound connection.
    pub fn is_bound(&self, ctx: ContextId) -> Result<bool> {
        Ok(self.registry()?.contains_key(&ctx))
    }
}

/// Installs the process-wide connection scope.
///
/// This is the explicit initialization step for code that wants one shared
/// scope over one physical pool. It may be called at most once; a second
/// call fails and leaves the installed scope untouched. Tests should prefer
/// constructing isolated [`ConnectionScope`] instances directly.
pub fn install(scope: ConnectionScope) -> Result<()> {
    GLOBAL_SCOPE
        .set(scope)
        .map_err(|_| ScopeError::App("connection scope already installed".to_string()))
}

/// Returns the installed process-wide scope.
pub fn global() -> Result<&'static ConnectionScope> {
    GLOBAL_SCOPE
        .get()
        .ok_or_else(|| ScopeError::App("connection scope not installed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counting fake handle; records every forwarded call.
    #[derive(Default)]
    struct FakeHandle {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        closes: AtomicUsize,
        mode_sets: AtomicUsize,
        manual: AtomicBool,
        fail_close: AtomicBool,
    }

    impl ConnectionHandle for FakeHandle {
        fn commit(&self) -> Result<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&self) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_auto_commit(&self, enabled: bool) -> Result<()> {
            self.mode_sets.fetch_add(1, Ordering::SeqCst);
            self.manual.store(!enabled, Ordering::SeqCst);
            Ok(())
        }

        fn auto_commit(&self) -> Result<bool> {
            Ok(!self.manual.load(Ordering::SeqCst))
        }

        fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(ScopeError::handle(
                    crate::core::HandleOp::Close,
                    "simulated close failure",
                ));
            }
            Ok(())
        }
    }

    /// Fake provider that hands out counting handles and can simulate
    /// pool exhaustion.
    #[derive(Default)]
    struct FakePool {
        handed_out: Mutex<Vec<Arc<FakeHandle>>>,
        exhausted: AtomicBool,
    }

    impl FakePool {
        fn handle(&self, index: usize) -> Arc<FakeHandle> {
            Arc::clone(&self.handed_out.lock().unwrap()[index])
        }

        fn handle_count(&self) -> usize {
            self.handed_out.lock().unwrap().len()
        }
    }

    impl PoolProvider for FakePool {
        fn get_connection(&self) -> Result<Arc<dyn ConnectionHandle>> {
            if self.exhausted.load(Ordering::SeqCst) {
                return Err(ScopeError::Acquisition("pool exhausted".into()));
            }
            let handle = Arc::new(FakeHandle::default());
            self.handed_out.lock().unwrap().push(Arc::clone(&handle));
            Ok(handle)
        }
    }

    fn scope_with_pool() -> (ConnectionScope, Arc<FakePool>) {
        let pool = Arc::new(FakePool::default());
        (ConnectionScope::new(pool.clone()), pool)
    }

    #[test]
    fn test_acquire_reuses_the_bound_handle() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        let first = scope.acquire(ctx).unwrap();
        let second = scope.acquire(ctx).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.handle_count(), 1);
    }

    #[test]
    fn test_distinct_contexts_get_distinct_handles() {
        let (scope, pool) = scope_with_pool();
        let a = ContextId::fresh();
        let b = ContextId::fresh();

        let handle_a = scope.acquire(a).unwrap();
        let handle_b = scope.acquire(b).unwrap();

        assert!(!Arc::ptr_eq(&handle_a, &handle_b));
        assert_eq!(pool.handle_count(), 2);
    }

    #[test]
    fn test_release_then_acquire_returns_a_new_handle() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        let first = scope.acquire(ctx).unwrap();
        scope.release(ctx).unwrap();
        assert!(!scope.is_bound(ctx).unwrap());

        let second = scope.acquire(ctx).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(pool.handle(0).closes.load(Ordering::SeqCst), 1);
        assert_eq!(pool.handle_count(), 2);
    }

    #[test]
    fn test_release_removes_binding_even_when_close_fails() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        scope.acquire(ctx).unwrap();
        pool.handle(0).fail_close.store(true, Ordering::SeqCst);

        let result = scope.release(ctx);
        assert!(matches!(
            result,
            Err(ScopeError::Handle {
                op: crate::core::HandleOp::Close,
                ..
            })
        ));

        // Context is not stranded: the next acquire starts fresh.
        assert!(!scope.is_bound(ctx).unwrap());
        let old: Arc<dyn ConnectionHandle> = pool.handle(0);
        let fresh = scope.acquire(ctx).unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
    }

    #[test]
    fn test_release_on_unbound_context_acquires_and_closes() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        scope.release(ctx).unwrap();

        assert_eq!(pool.handle_count(), 1);
        assert_eq!(pool.handle(0).closes.load(Ordering::SeqCst), 1);
        assert!(!scope.is_bound(ctx).unwrap());
    }

    #[test]
    fn test_is_bound_tracks_the_binding_lifecycle() {
        let (scope, _pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        assert!(!scope.is_bound(ctx).unwrap());
        scope.acquire(ctx).unwrap();
        assert!(scope.is_bound(ctx).unwrap());
        scope.release(ctx).unwrap();
        assert!(!scope.is_bound(ctx).unwrap());
    }

    #[test]
    fn test_transaction_mode_round_trip() {
        let (scope, _pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        scope.set_transaction_mode(ctx, true).unwrap();
        assert!(scope.is_manual_transaction(ctx).unwrap());

        scope.set_transaction_mode(ctx, false).unwrap();
        assert!(!scope.is_manual_transaction(ctx).unwrap());
    }

    #[test]
    fn test_commit_and_rollback_forward_to_the_bound_handle_only() {
        let (scope, pool) = scope_with_pool();
        let a = ContextId::fresh();
        let b = ContextId::fresh();

        scope.acquire(a).unwrap();
        scope.acquire(b).unwrap();

        scope.commit(a).unwrap();
        scope.rollback(b).unwrap();

        let handle_a = pool.handle(0);
        let handle_b = pool.handle(1);
        assert_eq!(handle_a.commits.load(Ordering::SeqCst), 1);
        assert_eq!(handle_a.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(handle_b.commits.load(Ordering::SeqCst), 0);
        assert_eq!(handle_b.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_transaction_lifecycle_scenario() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();

        scope.acquire(ctx).unwrap();
        scope.set_transaction_mode(ctx, true).unwrap();
        scope.commit(ctx).unwrap();
        scope.release(ctx).unwrap();

        let handle = pool.handle(0);
        assert!(handle.manual.load(Ordering::SeqCst));
        assert_eq!(handle.mode_sets.load(Ordering::SeqCst), 1);
        assert_eq!(handle.commits.load(Ordering::SeqCst), 1);
        assert_eq!(handle.closes.load(Ordering::SeqCst), 1);
        assert!(!scope.is_bound(ctx).unwrap());
    }

    #[test]
    fn test_failed_acquisition_creates_no_binding() {
        let (scope, pool) = scope_with_pool();
        let ctx = ContextId::fresh();
        pool.exhausted.store(true, Ordering::SeqCst);

        let result = scope.acquire(ctx);
        assert!(matches!(result, Err(ScopeError::Acquisition(_))));
        assert!(!scope.is_bound(ctx).unwrap());

        // A later attempt is free to try again once the pool recovers.
        pool.exhausted.store(false, Ordering::SeqCst);
        scope.acquire(ctx).unwrap();
        assert!(scope.is_bound(ctx).unwrap());
    }

    #[test]
    fn test_global_scope_requires_explicit_install() {
        assert!(global().is_err());

        let (scope, _pool) = scope_with_pool();
        install(scope).unwrap();
        assert!(global().is_ok());

        let (second, _pool) = scope_with_pool();
        let result = install(second);
        assert!(matches!(result, Err(ScopeError::App(_))));
    }
}
