//! Single-writer, many-reader slot for the outcome of one background run.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::ExecutionError;

pub type Outcome<T, E> = Result<T, ExecutionError<E>>;

struct Slot<T, E> {
    outcome: Mutex<Option<Outcome<T, E>>>,
    ready: Condvar,
}

impl<T, E> Slot<T, E> {
    fn lock(&self) -> MutexGuard<'_, Option<Outcome<T, E>>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pending or finished outcome of one `Executor::execute_async` call.
///
/// Clones share the same slot. The slot moves from pending to a terminal
/// state exactly once; every later read, from any thread, sees that state.
///
/// Waiting on a handle never cancels the work behind it: when `get` times
/// out, the action keeps running and a later `get` sees how it ended.
pub struct ResultHandle<T, E> {
    slot: Arc<Slot<T, E>>,
}

impl<T, E> ResultHandle<T, E> {
    pub(crate) fn pending() -> Self {
        Self {
            slot: Arc::new(Slot {
                outcome: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// Record the terminal outcome and wake all waiters. Returns false,
    /// leaving the slot untouched, if an outcome was already recorded.
    pub(crate) fn complete(&self, outcome: Outcome<T, E>) -> bool {
        let mut guard = self.slot.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(outcome);
        self.slot.ready.notify_all();
        true
    }

    /// Whether a terminal state has been recorded. Never blocks on the action.
    pub fn is_finished(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Wait for the outcome, at most `timeout` when given.
    ///
    /// An elapsed timeout yields `ExecutionError::Timeout` while the
    /// background run continues. `None` waits indefinitely.
    pub fn get(&self, timeout: Option<Duration>) -> Outcome<T, E>
    where
        T: Clone,
    {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut guard = self.slot.lock();

        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            match (deadline, timeout) {
                (Some(deadline), Some(waited)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(ExecutionError::Timeout { waited });
                    }
                    guard = self
                        .slot
                        .ready
                        .wait_timeout(guard, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                // No timeout, or one too large to represent as a deadline.
                _ => {
                    guard = self
                        .slot
                        .ready
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Non-blocking read: `None` while pending.
    pub fn try_get(&self) -> Option<Outcome<T, E>>
    where
        T: Clone,
    {
        self.slot.lock().clone()
    }
}

impl<T, E> Clone for ResultHandle<T, E> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T, E> fmt::Debug for ResultHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.lock().as_ref() {
            None => "pending",
            Some(Ok(_)) => "succeeded",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("ResultHandle").field("state", &state).finish()
    }
}
