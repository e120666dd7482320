//! Injected progress and cancellation capability.
//!
//! Extraction over large volumes accepts a [`ProgressSink`] supplied by
//! the host's UI layer. Cancellation is polled only at whole-slice or
//! whole-cluster boundaries so internal invariants hold on abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress reporting and cancellation, injected per call.
pub trait ProgressSink: Send + Sync {
    /// Reports completion in [0, 1]. The default discards the report.
    fn report(&self, _fraction: f32) {}

    /// Whether the caller requested cancellation.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// No-op sink for callers without a UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Sink backed by a shared cancellation flag.
///
/// Progress reports are discarded; cancellation is read from the flag
/// with sequentially consistent ordering.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Wraps a shared flag.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

impl ProgressSink for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
