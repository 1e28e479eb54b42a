//! Build context
//!
//! Threaded by reference through every recursive extraction step: a
//! cooperative cancellation flag plus the extraction options.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Options and cancellation for one top-level build
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    cancel: Arc<AtomicBool>,
    /// Extract vendor-extension keys in map extraction instead of skipping
    /// them
    pub include_extensions: bool,
    /// Worker-pool override for concurrent extraction; hardware parallelism
    /// when unset
    pub concurrency: Option<usize>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions(mut self) -> Self {
        self.include_extensions = true;
        self
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    /// Raise the cancellation signal. Workers observe it between items;
    /// in-flight work may finish but its result is dropped.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// The shared flag, for wiring into cancellable iteration.
    pub fn cancel_flag(&self) -> &Arc<AtomicBool> {
        &self.cancel
    }
}
