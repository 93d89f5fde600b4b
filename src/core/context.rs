/// Execution Context Identity
///
/// A `ContextId` names one unit of isolation: a thread or a concurrent task
/// whose database work must not be visible to any other unit. It is identity
/// only; the scope uses it purely as the lookup key for the context's
/// connection binding.
use std::thread;
use uuid::Uuid;

/// Opaque identifier for an execution context.
///
/// Two constructors cover the two context models:
/// - [`ContextId::current`] keys the binding to the calling OS thread, the
///   classic thread-per-unit-of-work model.
/// - [`ContextId::fresh`] mints a unique token for task-style contexts that
///   may hop threads; the caller carries the id for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Key);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Thread(thread::ThreadId),
    Token(Uuid),
}

impl ContextId {
    /// Returns the id of the calling thread's context.
    pub fn current() -> Self {
        ContextId(Key::Thread(thread::current().id()))
    }

    /// Mints a new context id unrelated to any thread.
    pub fn fresh() -> Self {
        ContextId(Key::Token(Uuid::new_v4()))
    }
}
