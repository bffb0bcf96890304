//! Shared close signal used by every stage's worker loop.
//!
//! Generalises the compare-and-swap-guarded `closeChan`/`closed` pair from
//! the reference design into one reusable type instead of hand-rolling it
//! per stage, the way the teacher's `stages::stage::ControlMessage` gestures
//! at but never finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::CoreError;

/// A non-blocking, idempotent shutdown signal paired with a completion
/// notification a worker fires once it has actually terminated.
#[derive(Clone)]
pub struct CloseSignal {
    inner: Arc<Inner>,
}

struct Inner {
    running: AtomicBool,
    close: Notify,
    closed: Notify,
    done: AtomicBool,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                close: Notify::new(),
                closed: Notify::new(),
                done: AtomicBool::new(false),
            }),
        }
    }

    /// Signals shutdown. Idempotent: only the first call wakes waiters.
    pub fn close_async(&self) {
        if self
            .inner
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.close.notify_waiters();
        }
    }

    /// Resolves once `close_async` has been called.
    ///
    /// `Notify::notify_waiters` only wakes waiters already registered at
    /// the time it is called — it stores no permit. A plain "check the
    /// flag, then await `notified()`" risks missing a `close_async` that
    /// lands in the gap between the two, leaving the waiter parked
    /// forever. `enable()` registers interest before the flag is checked,
    /// so a notification landing in that gap is not lost.
    pub async fn closed_requested(&self) {
        let notified = self.inner.close.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.inner.running.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }

    /// Returns `true` if `close_async` has not yet been called.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Called by a stage's worker exactly once, when it has finished
    /// draining and will do no further work.
    pub fn mark_done(&self) {
        self.inner.done.store(true, Ordering::SeqCst);
        self.inner.closed.notify_waiters();
    }

    /// Blocks until `mark_done` has been called, with no bound on how long
    /// that takes. Used by the composition layer to await a pipeline's
    /// natural completion rather than a caller-supplied shutdown grace
    /// period.
    ///
    /// Registers interest via `enable()` before checking `done`, for the
    /// same reason as [`Self::closed_requested`]: `mark_done`'s
    /// `notify_waiters` call stores no permit, so a naive check-then-await
    /// can race a `mark_done` that lands in between and hang forever —
    /// unlike `wait_for_close`, this has no timeout to recover with.
    pub async fn wait_until_done(&self) {
        let notified = self.inner.closed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.inner.done.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }

    /// Blocks until `mark_done` has been called or `timeout` elapses.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), CoreError> {
        let notified = self.inner.closed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.inner.done.load(Ordering::SeqCst) {
            return Ok(());
        }
        tokio::select! {
            _ = notified.as_mut() => Ok(()),
            _ = tokio::time::sleep(timeout) => {
                if self.inner.done.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(CoreError::Timeout)
                }
            }
        }
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_async_is_idempotent() {
        let sig = CloseSignal::new();
        sig.close_async();
        sig.close_async();
        assert!(!sig.is_running());
    }

    #[tokio::test]
    async fn test_wait_for_close_times_out() {
        let sig = CloseSignal::new();
        let err = sig.wait_for_close(Duration::from_millis(20)).await;
        assert!(matches!(err, Err(CoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_wait_for_close_resolves_on_mark_done() {
        let sig = CloseSignal::new();
        sig.mark_done();
        assert!(sig.wait_for_close(Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_until_done_resolves_after_mark_done() {
        let sig = CloseSignal::new();
        sig.mark_done();
        tokio::time::timeout(Duration::from_millis(20), sig.wait_until_done())
            .await
            .expect("wait_until_done should resolve immediately once done");
    }
}
