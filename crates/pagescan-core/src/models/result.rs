//! Per-page outcomes and the result of a whole run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Result record for one page, keyed by its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutcome {
    /// Zero-based page index.
    pub page_index: usize,
    /// Recognized text; empty when the page failed.
    pub text: String,
    /// Error kind for a failed page.
    pub error: Option<PageError>,
}

impl PageOutcome {
    pub fn success(page_index: usize, text: impl Into<String>) -> Self {
        Self {
            page_index,
            text: text.into(),
            error: None,
        }
    }

    pub fn failure(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            text: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 1-based page number as shown to users.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }
}

/// Lifecycle of a run. There is no failed terminal state: pages fail
/// individually, the run itself always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    CompletedWithErrors,
}

/// Output of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Recognized text per page in page order; empty for failed pages.
    pub ordered_page_texts: Vec<String>,
    /// Delimited per-page blocks, error text in place of failed pages.
    pub full_text: String,
    /// Number of pages in the document.
    pub page_count: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Outcomes in page order.
    pub outcomes: Vec<PageOutcome>,
}

impl ExtractionResult {
    /// Result of a run over a document without pages.
    pub fn empty(elapsed: Duration) -> Self {
        Self {
            ordered_page_texts: Vec::new(),
            full_text: String::new(),
            page_count: 0,
            elapsed,
            outcomes: Vec::new(),
        }
    }

    /// Outcomes that carry an error.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn failed_count(&self) -> usize {
        self.failed_pages().count()
    }

    /// Terminal state of the run.
    pub fn state(&self) -> RunState {
        if self.failed_count() == 0 {
            RunState::Completed
        } else {
            RunState::CompletedWithErrors
        }
    }
}
