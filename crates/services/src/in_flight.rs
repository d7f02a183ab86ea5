use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a one-shot "operation outstanding" flag until dropped.
///
/// Only one guard per flag can exist at a time; the flag is released on drop,
/// including when the guarded future is cancelled or returns early.
pub(crate) struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    /// Returns `None` when another operation already holds the flag.
    pub(crate) fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
