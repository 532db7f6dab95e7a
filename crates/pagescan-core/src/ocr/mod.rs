//! Text recognition on rasterized pages.

mod tesseract;

pub use tesseract::{locate_tesseract, tesseract_version, TesseractRecognizer};

use image::DynamicImage;

use crate::error::OcrError;
use crate::models::config::{LanguageSet, Profile};

/// Synchronous call contract of a recognition engine.
///
/// Implementations are invoked from several worker threads at once. Any
/// failure must come back as an [`OcrError`]; it never aborts the process.
pub trait Recognizer: Send + Sync {
    /// Recognize the text on one page bitmap.
    fn recognize(
        &self,
        bitmap: &DynamicImage,
        languages: &LanguageSet,
        profile: Profile,
    ) -> Result<String, OcrError>;
}

impl<R: Recognizer + ?Sized> Recognizer for &R {
    fn recognize(
        &self,
        bitmap: &DynamicImage,
        languages: &LanguageSet,
        profile: Profile,
    ) -> Result<String, OcrError> {
        (**self).recognize(bitmap, languages, profile)
    }
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn recognize(
        &self,
        bitmap: &DynamicImage,
        languages: &LanguageSet,
        profile: Profile,
    ) -> Result<String, OcrError> {
        (**self).recognize(bitmap, languages, profile)
    }
}
