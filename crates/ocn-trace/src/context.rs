//! Request-scoped trace context.
//!
//! Each logical request owns exactly one [`TraceContext`], bound to the
//! executing task for the duration of [`TraceContext::scope`] (or to the
//! current thread for [`TraceContext::sync_scope`]). Concurrent requests
//! therefore never share state, and the holder is dropped when the scope
//! ends, whether the request succeeded, failed or panicked.
//!
//! ```text
//! Unset ──activate──▶ Active ──clear / scope end──▶ Cleared
//! ```

use std::cell::RefCell;
use std::future::Future;

use crate::id::TraceId;

tokio::task_local! {
    static CURRENT: TraceContext;
}

/// Lifecycle state of a request's trace context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// No trace id recorded yet
    Unset,
    /// A trace id is active and read-only for the rest of the request
    Active,
    /// The request finished; reads return nothing
    Cleared,
}

#[derive(Debug)]
enum Slot {
    Unset,
    Active(TraceId),
    Cleared,
}

/// Per-request holder of the active trace id.
#[derive(Debug)]
pub struct TraceContext {
    slot: RefCell<Slot>,
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceContext {
    /// Create an empty context in the `Unset` state.
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(Slot::Unset),
        }
    }

    /// Create a context that is already `Active` with the given id.
    pub fn with_trace_id(trace_id: TraceId) -> Self {
        Self {
            slot: RefCell::new(Slot::Active(trace_id)),
        }
    }

    pub fn state(&self) -> TraceState {
        match &*self.slot.borrow() {
            Slot::Unset => TraceState::Unset,
            Slot::Active(_) => TraceState::Active,
            Slot::Cleared => TraceState::Cleared,
        }
    }

    /// The active trace id, if any.
    pub fn trace_id(&self) -> Option<TraceId> {
        match &*self.slot.borrow() {
            Slot::Active(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Activate the context with `trace_id`.
    ///
    /// Only an `Unset` context transitions. An `Active` context keeps its id
    /// and a `Cleared` context stays cleared. Returns the id active after the
    /// call, if any.
    pub fn activate(&self, trace_id: TraceId) -> Option<TraceId> {
        let mut slot = self.slot.borrow_mut();
        match &*slot {
            Slot::Unset => {
                *slot = Slot::Active(trace_id.clone());
                Some(trace_id)
            }
            Slot::Active(existing) => {
                if *existing != trace_id {
                    tracing::warn!(
                        active = %existing,
                        requested = %trace_id,
                        "Trace id already active for this request; keeping the active id"
                    );
                }
                Some(existing.clone())
            }
            Slot::Cleared => None,
        }
    }

    /// Return the active id, generating and activating one if `Unset`.
    ///
    /// A `Cleared` context yields a fresh id that is not recorded.
    pub fn ensure(&self) -> TraceId {
        let mut slot = self.slot.borrow_mut();
        match &*slot {
            Slot::Active(id) => id.clone(),
            Slot::Unset => {
                let id = TraceId::generate();
                *slot = Slot::Active(id.clone());
                id
            }
            Slot::Cleared => TraceId::generate(),
        }
    }

    /// Transition to `Cleared`.
    pub fn clear(&self) {
        *self.slot.borrow_mut() = Slot::Cleared;
    }

    /// Run `future` with this context bound as the current request scope.
    ///
    /// The context is released when the future completes or is dropped.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, future).await
    }

    /// Run `f` synchronously with this context bound as the current request scope.
    pub fn sync_scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT.sync_scope(self, f)
    }
}

/// Whether the caller runs inside a request scope.
pub fn in_scope() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// State of the current request's context, or `None` outside any scope.
pub fn current_state() -> Option<TraceState> {
    CURRENT.try_with(TraceContext::state).ok()
}

/// The active trace id of the current request.
///
/// Returns `None` outside a request scope, before activation and after the
/// context was cleared.
pub fn get_current_trace_id() -> Option<TraceId> {
    CURRENT.try_with(TraceContext::trace_id).ok().flatten()
}

/// Activate the current request's context with `trace_id`.
///
/// Returns the id active after the call. Outside a request scope this is a
/// no-op that returns `None`.
pub fn set_current_trace_id(trace_id: TraceId) -> Option<TraceId> {
    match CURRENT.try_with(|ctx| ctx.activate(trace_id)) {
        Ok(active) => active,
        Err(_) => {
            tracing::debug!("set_current_trace_id called outside a request scope; ignoring");
            None
        }
    }
}

/// Return the current request's trace id, generating one if none is active.
///
/// Idempotent within a request scope. Outside a scope a fresh id is returned
/// on every call and nothing is recorded.
pub fn ensure_trace_id() -> TraceId {
    CURRENT.try_with(TraceContext::ensure).unwrap_or_else(|_| {
        let id = TraceId::generate();
        tracing::debug!(trace_id = %id, "ensure_trace_id called outside a request scope");
        id
    })
}

/// Clear the current request's trace id. No-op outside a request scope.
pub fn clear_current_trace_id() {
    let _ = CURRENT.try_with(TraceContext::clear);
}
