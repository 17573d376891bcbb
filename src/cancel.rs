//! Cooperative cancellation for long-running collection tasks.
//!
//! Provides a lightweight [`CancelToken`] that can be cloned into async tasks
//! to detect Ctrl+C and request early termination without losing items that
//! were already flushed to the storage sink. Tokens are always explicitly
//! owned and passed in; there is no process-global registry, so independent
//! collectors (and tests) never observe each other's cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable handle used to request and observe cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Waiters are notified exactly once.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested. Returns immediately if already set.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register as a waiter before reading the flag: notify_waiters only
        // wakes already-registered waiters, so checking first would miss a
        // cancel landing between the check and the await.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Sleep for `duration`, returning early with `false` if cancelled.
    ///
    /// Every time-based suspension in the collector goes through this so a
    /// cancellation request interrupts backoff and inter-chunk waits instead
    /// of being observed only at the next loop iteration.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}
