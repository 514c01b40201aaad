//! Cancellation of in-flight runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Handle for abandoning the in-flight submission of a surface.
///
/// Cloned into the host (e.g. an unmount hook). Any clone can abort; the
/// orchestrator drops the pending network call and applies no result.
///
/// # Example
///
/// ```
/// use runpad_core::execute::AbortHandle;
///
/// let handle = AbortHandle::new();
/// let handle_clone = handle.clone();
///
/// assert!(!handle.is_aborted());
/// handle_clone.abort();
/// assert!(handle.is_aborted());
/// ```
#[derive(Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

#[derive(Default)]
struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    /// Request abort and wake every task waiting in [`aborted`](Self::aborted).
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Reset the abort flag before a new run.
    pub fn reset(&self) {
        self.inner.aborted.store(false, Ordering::Release);
    }

    /// Resolve once abort has been requested.
    pub async fn aborted(&self) {
        loop {
            // Register before checking the flag so a concurrent abort is not missed.
            let notified = self.inner.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
