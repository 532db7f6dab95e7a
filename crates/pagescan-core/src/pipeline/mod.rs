//! The parallel page pipeline.
//!
//! A document is split into one [`PageTask`] per page. The [`Scheduler`]
//! runs them either one after another or on a bounded pool of worker
//! threads, and the outcomes are merged back in page order.

mod scheduler;
mod task;

pub use scheduler::{run_extraction, Scheduler, Strategy};
pub use task::PageTask;

use tracing::debug;

use crate::error::Result;
use crate::models::config::ExtractionConfig;
use crate::models::result::ExtractionResult;
use crate::ocr::Recognizer;
use crate::pdf::{Document, PdfDocument};

/// Open a PDF from raw bytes and extract every page.
///
/// The configuration is validated and the document opened before any page
/// work starts, so an unreadable file fails the whole call. Page-level
/// failures are reported inside the result instead.
pub fn extract_bytes<R, F>(
    bytes: &[u8],
    recognizer: R,
    config: &ExtractionConfig,
    progress: F,
) -> Result<ExtractionResult>
where
    R: Recognizer,
    F: FnMut(usize, usize),
{
    config.validate()?;

    let document = PdfDocument::open(bytes)?;
    debug!("Opened PDF: {} pages, {} bytes", document.page_count(), bytes.len());

    Ok(run_extraction(document, recognizer, config, progress))
}
