//! Model initialization progress reports.

use serde::{Deserialize, Serialize};

/// Progress reported by an engine while it fetches and loads a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitProgressReport {
    /// Progress as a fraction (0.0 to 1.0)
    pub progress: f64,
    /// Seconds since loading started
    pub time_elapsed: f64,
    /// Human-readable status line
    pub text: String,
}

impl InitProgressReport {
    pub fn new(progress: f64, time_elapsed: f64, text: impl Into<String>) -> Self {
        Self {
            progress: progress.clamp(0.0, 1.0),
            time_elapsed,
            text: text.into(),
        }
    }
}
