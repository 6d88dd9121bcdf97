//! Cancellable, deadline-bearing execution context.
//!
//! A [`Context`] travels with a single unit of work (one checkout request)
//! and is handed to every collaborator call. Cancellation is cooperative:
//! callers check [`Context::check`] before starting a step, or race a wait
//! against [`Context::done`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context was cancelled explicitly.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Execution context carrying an optional deadline and a cancellation flag.
///
/// Clones share the same cancellation flag, so cancelling any of them
/// cancels them all.
#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Arc<CancelState>,
}

impl Context {
    /// A context with no deadline that is never cancelled unless asked to.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: Arc::new(CancelState::default()),
        }
    }

    /// A fresh context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A fresh context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: Arc::new(CancelState::default()),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context sharing its flag.
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::Release);
        self.cancel.notify.notify_waiters();
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.cancelled.load(Ordering::Acquire) {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns `Err` if the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        let cancelled = async {
            loop {
                let notified = self.cancel.notify.notified();
                if self.cancel.cancelled.load(Ordering::Acquire) {
                    return ContextError::Cancelled;
                }
                notified.await;
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                reason = cancelled => reason,
                () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => cancelled.await,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
