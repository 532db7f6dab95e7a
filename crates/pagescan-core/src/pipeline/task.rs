//! The per-page unit of work.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::{OcrError, PageError};
use crate::models::config::ExtractionConfig;
use crate::models::result::PageOutcome;
use crate::ocr::Recognizer;
use crate::pdf::{self, Document};

/// One page's render-then-recognize work, bound to its index.
#[derive(Debug, Clone, Copy)]
pub struct PageTask<'a> {
    page_index: usize,
    config: &'a ExtractionConfig,
}

impl<'a> PageTask<'a> {
    pub fn new(page_index: usize, config: &'a ExtractionConfig) -> Self {
        Self { page_index, config }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn config(&self) -> &ExtractionConfig {
        self.config
    }

    /// Render the page, recognize it, and record the outcome.
    ///
    /// Consumes the task; failures are returned inside the outcome.
    pub fn execute<D, R>(self, document: &D, recognizer: &R) -> PageOutcome
    where
        D: Document + ?Sized,
        R: Recognizer + ?Sized,
    {
        match self.run(document, recognizer) {
            Ok(text) => {
                debug!(
                    "Page {}: {} chars recognized",
                    self.page_index + 1,
                    text.chars().count()
                );
                PageOutcome::success(self.page_index, text)
            }
            Err(err) => {
                warn!("Page {} failed: {}", self.page_index + 1, err);
                PageOutcome::failure(self.page_index, err)
            }
        }
    }

    fn run<D, R>(&self, document: &D, recognizer: &R) -> Result<String, PageError>
    where
        D: Document + ?Sized,
        R: Recognizer + ?Sized,
    {
        let bitmap = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf::rasterize(document, self.page_index, self.config.dpi, self.config.profile)
        }))
        .map_err(|payload| {
            PageError::RenderFailure(format!("renderer panicked: {}", panic_message(payload.as_ref())))
        })??;

        let recognized = panic::catch_unwind(AssertUnwindSafe(|| {
            recognizer.recognize(&bitmap, &self.config.languages, self.config.profile)
        }))
        .unwrap_or_else(|payload| Err(OcrError::Panicked(panic_message(payload.as_ref()))));

        Ok(recognized?)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
