//! Cooperative progress reporting and cancellation for long-running work.
//!
//! Split and merge process one sub-document per iteration. At the top of
//! each iteration the worker polls for cancellation, then reports
//! `100 * (i + 1) / total` together with an `"i+1 / total"` label. Nothing
//! is interrupted mid-iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

/// Sink for progress updates, polled for cancellation between iterations.
pub trait ProgressReporter {
    /// Report completion percentage (0-100) with a short label.
    fn report_progress(&self, percent: u8, label: &str);

    /// Whether the coordinating side asked the work to stop.
    fn is_cancellation_requested(&self) -> bool;
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reporter that discards progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report_progress(&self, _percent: u8, _label: &str) {}

    fn is_cancellation_requested(&self) -> bool {
        false
    }
}

/// Reporter that logs each step and honors a [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct ProgressLog {
    task: String,
    token: CancellationToken,
}

impl ProgressLog {
    pub fn new(task: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            task: task.into(),
            token,
        }
    }
}

impl ProgressReporter for ProgressLog {
    fn report_progress(&self, percent: u8, label: &str) {
        info!("{}: {}% ({})", self.task, percent, label);
    }

    fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Percentage after finishing iteration `index` of `total`.
pub fn percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (100 * (index + 1) / total).min(100) as u8
}

/// Label for iteration `index` of `total`: `"3 / 10"`.
pub fn step_label(index: usize, total: usize) -> String {
    format!("{} / {}", index + 1, total)
}
