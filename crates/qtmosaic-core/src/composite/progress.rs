//! Progress reporting for long-running canvas preparation.

use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

/// Sink for incremental progress, `fraction` in `[0, 1]`.
pub trait ProgressCallback: Sync {
    fn report(&self, fraction: f64);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn report(&self, _fraction: f64) {}
}

/// Logs progress through `tracing` every ten percent.
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    last_decile: AtomicU32,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last_decile: AtomicU32::new(0),
        }
    }
}

impl ProgressCallback for LogProgress {
    fn report(&self, fraction: f64) {
        let decile = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u32;
        let previous = self.last_decile.fetch_max(decile, Ordering::Relaxed);
        if decile > previous {
            info!(task = %self.label, percent = decile * 10, "Progress");
        }
    }
}
