//! Run statistics accumulated by the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::result::ExtractionResult;

/// Counters over one or more runs.
///
/// The pipeline never keeps these itself; each run yields a value via
/// [`RunStats::from_result`] and callers fold them with [`RunStats::accumulate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub files_processed: usize,
    pub pages_processed: usize,
    pub failed_pages: usize,
    pub last_duration: Duration,
    pub total_duration: Duration,
}

impl RunStats {
    /// Statistics of a single run.
    pub fn from_result(result: &ExtractionResult) -> Self {
        Self {
            files_processed: 1,
            pages_processed: result.page_count,
            failed_pages: result.failed_count(),
            last_duration: result.elapsed,
            total_duration: result.elapsed,
        }
    }

    /// Fold another run into these counters.
    pub fn accumulate(&mut self, other: &RunStats) {
        self.files_processed += other.files_processed;
        self.pages_processed += other.pages_processed;
        self.failed_pages += other.failed_pages;
        self.last_duration = other.last_duration;
        self.total_duration += other.total_duration;
    }

    /// Record a run directly from its result.
    pub fn record(&mut self, result: &ExtractionResult) {
        self.accumulate(&Self::from_result(result));
    }
}
