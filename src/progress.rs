//! Progress reporting and cooperative cancellation for long-running stages.
//!
//! The pipeline stages themselves are synchronous; callers that want
//! feedback (a UI progress bar, a CLI spinner) pass a [`ProgressSink`] and
//! receive coarse per-layer / per-file events. Cancellation is cooperative:
//! stages poll a [`CancelToken`] at file boundaries and bail out with
//! [`LoadError::Cancelled`], leaving the last committed state untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::LoadError;

/// Coarse pipeline progress, emitted at layer and file granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    LayerScanStarted {
        layer: String,
    },
    LayerScanFinished {
        layer: String,
        files: usize,
    },
    FileParsed {
        layer: String,
        file: String,
    },
    LayerMerged {
        layer: String,
        issues: usize,
    },
    CascadeMerged {
        layers: usize,
    },
    ReferencesResolved {
        resolved: usize,
        unresolved: usize,
    },
    ValidationFinished {
        issues: usize,
    },
}

/// Receives progress events from pipeline stages.
///
/// Implementations must tolerate being called from whichever thread runs the
/// pipeline and should return quickly; heavy consumers should queue.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Sink that discards everything. The default when callers pass no sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _event: ProgressEvent) {}
}

/// Sink that records every event, for tests and for UIs that poll.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: parking_lot::Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

/// Shared cancellation flag. Clones observe the same flag, so a UI thread can
/// cancel a refresh running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Poll point for stages: `Err(Cancelled)` once [`cancel`](Self::cancel)
    /// has been called.
    pub fn checkpoint(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
