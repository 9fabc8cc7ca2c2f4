//! Completion counter shared between a pipeline stage and its observers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Monotonically increasing count of finished work units.
///
/// Cloning yields another handle to the same counter, so a caller can keep a
/// clone and poll it from another thread while a stage runs. Failed units
/// count as finished.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<ProgressInner>,
}

#[derive(Debug, Default)]
struct ProgressInner {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of finished units.
    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Number of units the current run expects to finish.
    pub fn total(&self) -> usize {
        self.inner.total.load(Ordering::Acquire)
    }

    /// Whether every expected unit has finished.
    pub fn is_done(&self) -> bool {
        self.completed() >= self.total()
    }

    /// Start a new run of `total` units.
    pub(crate) fn reset(&self, total: usize) {
        self.inner.completed.store(0, Ordering::Release);
        self.inner.total.store(total, Ordering::Release);
    }

    /// Record one finished unit and return the new count.
    pub(crate) fn advance(&self) -> usize {
        self.inner.completed.fetch_add(1, Ordering::AcqRel) + 1
    }
}
