//! Error types for the pagescan-core library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the pagescan library.
#[derive(Error, Debug)]
pub enum PagescanError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-page export could not be packaged.
    #[error("packaging error: {0}")]
    Package(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to opening and rasterizing PDF documents.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The document could not be parsed.
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Page index outside `0..page_count`.
    #[error("invalid page index: {0}")]
    InvalidPage(usize),

    /// A page could not be turned into a bitmap.
    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },
}

/// Errors raised by the recognition engine.
#[derive(Error, Debug)]
pub enum OcrError {
    /// No usable engine binary was found.
    #[error("recognition engine not found: {0}")]
    EngineNotFound(String),

    /// The engine process could not be started or fed.
    #[error("failed to run recognition engine: {0}")]
    Spawn(String),

    /// The engine exited unsuccessfully.
    #[error("recognition engine exited with {status}: {stderr}")]
    Engine { status: String, stderr: String },

    /// The bitmap could not be encoded for the engine.
    #[error("failed to encode bitmap: {0}")]
    Encode(String),

    /// The engine call panicked.
    #[error("recognition engine panicked: {0}")]
    Panicked(String),
}

/// Errors related to configuration values and files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DPI must be a positive integer")]
    InvalidDpi,

    #[error("language set must not be empty")]
    EmptyLanguages,

    #[error("invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("worker count must be at least 1")]
    InvalidWorkers,

    #[error("unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error kind recorded in a single page's outcome.
///
/// Page errors never propagate past the scheduler; they are stored next to the
/// page they belong to and rendered into the aggregated text.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum PageError {
    /// The page bitmap could not be produced.
    #[error("{0}")]
    RenderFailure(String),

    /// The recognition engine failed on the page.
    #[error("{0}")]
    RecognitionFailure(String),
}

impl PageError {
    /// Short name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PageError::RenderFailure(_) => "RenderFailure",
            PageError::RecognitionFailure(_) => "RecognitionFailure",
        }
    }

    /// The preserved underlying message.
    pub fn message(&self) -> &str {
        match self {
            PageError::RenderFailure(msg) | PageError::RecognitionFailure(msg) => msg,
        }
    }
}

impl From<PdfError> for PageError {
    fn from(err: PdfError) -> Self {
        PageError::RenderFailure(err.to_string())
    }
}

impl From<OcrError> for PageError {
    fn from(err: OcrError) -> Self {
        PageError::RecognitionFailure(err.to_string())
    }
}

/// Result type for the pagescan library.
pub type Result<T> = std::result::Result<T, PagescanError>;
