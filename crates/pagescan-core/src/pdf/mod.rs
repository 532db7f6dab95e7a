//! Document access and page rasterization.

mod document;

pub use document::PdfDocument;
#[cfg(test)]
pub(crate) use document::tests::{build_pdf, TestPage};

use image::DynamicImage;
use tracing::trace;

use crate::error::PdfError;
use crate::models::config::Profile;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// An opened, zero-indexed sequence of pages.
///
/// Implementations are shared read-only between recognition workers, so each
/// worker renders its own page. Dropping the document closes it.
pub trait Document: Sync {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Render page `index` into an RGB bitmap at `dpi`.
    ///
    /// Output dimensions are a deterministic function of the page's physical
    /// size and `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage>;
}

impl<D: Document + ?Sized> Document for &D {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        (**self).render_page(index, dpi)
    }
}

/// Render a page and prepare it for the recognition engine.
///
/// The fast profile reduces the bitmap to a single gray channel; the accurate
/// profile hands the rendered bitmap over unchanged.
pub fn rasterize<D: Document + ?Sized>(
    document: &D,
    index: usize,
    dpi: u32,
    profile: Profile,
) -> Result<DynamicImage> {
    let bitmap = document.render_page(index, dpi)?;
    trace!(
        "Rendered page {} at {} dpi: {}x{}",
        index + 1,
        dpi,
        bitmap.width(),
        bitmap.height()
    );

    if profile.wants_grayscale() {
        Ok(DynamicImage::ImageLuma8(bitmap.to_luma8()))
    } else {
        Ok(bitmap)
    }
}

/// Pixel length of `points` (1/72 inch) at `dpi`.
pub fn points_to_pixels(points: f32, dpi: u32) -> u32 {
    ((points.abs() * dpi as f32) / 72.0).round().max(1.0) as u32
}
