//! Core library for scanned-document OCR.
//!
//! This crate provides:
//! - PDF opening and page rasterization
//! - Text recognition through the Tesseract engine
//! - A parallel page pipeline that keeps results in page order
//! - Full-text aggregation and per-page zip export

pub mod aggregate;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use aggregate::{aggregate, package, page_block};
pub use error::{ConfigError, OcrError, PageError, PagescanError, PdfError, Result};
pub use models::{
    EngineConfig, ExecutionMode, ExtractionConfig, ExtractionResult, LanguageSet, OutputConfig,
    PageOutcome, PagescanConfig, Preset, Profile, RunState, RunStats,
};
pub use ocr::{locate_tesseract, tesseract_version, Recognizer, TesseractRecognizer};
pub use pdf::{Document, PdfDocument};
pub use pipeline::{extract_bytes, run_extraction, PageTask, Scheduler, Strategy};
