//! Counters and timestamps attached to every run result.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metadata produced alongside a run result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339 timestamp when the run started.
    pub generated_at: String,
    /// Input files that produced output.
    pub files_processed: usize,
    /// Input files abandoned or skipped.
    pub files_skipped: usize,
    /// Data rows read across all inputs, before rules.
    pub rows_read: usize,
    /// Rows removed by row rules.
    pub rows_dropped: usize,
    /// Rows whose label resolved to no canonical network.
    pub unknown_rows: usize,
}

impl RunMetadata {
    /// Empty counters stamped with the current time.
    pub fn start() -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            files_processed: 0,
            files_skipped: 0,
            rows_read: 0,
            rows_dropped: 0,
            unknown_rows: 0,
        }
    }

    /// Log the counters at INFO under `label`.
    pub fn log(&self, label: &str) {
        info!(
            files_processed = self.files_processed,
            files_skipped = self.files_skipped,
            rows_read = self.rows_read,
            rows_dropped = self.rows_dropped,
            unknown_rows = self.unknown_rows,
            "{} finished",
            label
        );
    }
}
