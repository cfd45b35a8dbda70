//! Rasterizer adapter: turning a document path into first-page pixels.
//!
//! The similarity engine only depends on the [`Rasterizer`] contract.
//! Implementations provide three fallible primitives; the provided
//! methods on the trait degrade every failure to a conventional fallback
//! so that callers never see an error:
//!
//! | Method | Fallback |
//! |---|---|
//! | [`Rasterizer::render`] | `None` |
//! | [`Rasterizer::height_over_width`] | [`FALLBACK_HEIGHT_OVER_WIDTH`] (√2, ISO paper) |
//! | [`Rasterizer::page_count`] | [`FALLBACK_PAGE_COUNT`] |
//!
//! Built-in implementations:
//! - [`PdfRasterizer`]: PDF documents
//! - [`ImageRasterizer`]: raster image files as single-page documents
//! - [`DocumentRasterizer`]: picks one of the above by file extension

pub mod images;
pub mod pdf;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

pub use images::{ImageRasterizer, IMAGE_EXTENSIONS};
pub use pdf::{PdfRasterizer, PDF_EXTENSIONS};

/// Height/width ratio reported when a page cannot be measured.
pub const FALLBACK_HEIGHT_OVER_WIDTH: f64 = std::f64::consts::SQRT_2;

/// Page count reported when a document cannot be opened.
pub const FALLBACK_PAGE_COUNT: u32 = 1;

/// Every extension [`DocumentRasterizer`] can open.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Errors produced by rasterizer implementations.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The document could not be opened.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document could not be decoded.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// Document path
        path: PathBuf,
        /// The underlying decoder error
        #[source]
        source: image::ImageError,
    },

    /// The PDF could not be parsed or has a malformed page tree.
    #[error("Invalid PDF {path}: {message}")]
    Pdf {
        /// Document path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The first page has no pixels.
    #[error("Empty page: {0}")]
    EmptyPage(PathBuf),

    /// The rasterizer does not handle this kind of document.
    #[error("Unsupported document format: {0}")]
    Unsupported(PathBuf),
}

/// Produces grayscale-convertible rasters of a document's first page.
///
/// Implementations must be shareable across the thumbnail worker pool.
pub trait Rasterizer: Send + Sync {
    /// Render the first page scaled to fit within `max_width`×`max_height`.
    ///
    /// # Errors
    ///
    /// Returns a [`RasterError`] when the document cannot be rendered.
    fn try_render(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, RasterError>;

    /// First page size as `(width, height)` in the document's own units.
    ///
    /// # Errors
    ///
    /// Returns a [`RasterError`] when the document cannot be opened.
    fn try_page_size(&self, path: &Path) -> Result<(f64, f64), RasterError>;

    /// Number of pages in the document.
    ///
    /// # Errors
    ///
    /// Returns a [`RasterError`] when the document cannot be opened.
    fn try_page_count(&self, path: &Path) -> Result<u32, RasterError>;

    /// Render the first page, or `None` when it cannot be rendered.
    fn render(&self, path: &Path, max_width: u32, max_height: u32) -> Option<DynamicImage> {
        match self.try_render(path, max_width, max_height) {
            Ok(image) => Some(image),
            Err(e) => {
                log::debug!("Render failed: {}", e);
                None
            }
        }
    }

    /// First page height divided by width, or √2 when unknown.
    fn height_over_width(&self, path: &Path) -> f64 {
        ratio_or_fallback(self.try_page_size(path))
    }

    /// Page count, or `1` when unknown.
    fn page_count(&self, path: &Path) -> u32 {
        count_or_fallback(self.try_page_count(path))
    }
}

fn ratio_or_fallback(size: Result<(f64, f64), RasterError>) -> f64 {
    match size {
        Ok((w, h)) if w > 0.0 && h > 0.0 => h / w,
        Ok(_) => FALLBACK_HEIGHT_OVER_WIDTH,
        Err(e) => {
            log::debug!("Page size unavailable: {}", e);
            FALLBACK_HEIGHT_OVER_WIDTH
        }
    }
}

fn count_or_fallback(count: Result<u32, RasterError>) -> u32 {
    match count {
        Ok(n) if n > 0 => n,
        Ok(_) => FALLBACK_PAGE_COUNT,
        Err(e) => {
            log::debug!("Page count unavailable: {}", e);
            FALLBACK_PAGE_COUNT
        }
    }
}

/// Per-path memo of aspect ratios and page counts, fallbacks included.
#[derive(Debug, Default)]
pub(crate) struct PageMemo {
    ratios: Mutex<HashMap<PathBuf, f64>>,
    page_counts: Mutex<HashMap<PathBuf, u32>>,
}

impl PageMemo {
    pub(crate) fn ratio(
        &self,
        path: &Path,
        measure: impl FnOnce() -> Result<(f64, f64), RasterError>,
    ) -> f64 {
        if let Some(ratio) = self.ratios.lock().ok().and_then(|m| m.get(path).copied()) {
            return ratio;
        }
        let ratio = ratio_or_fallback(measure());
        if let Ok(mut map) = self.ratios.lock() {
            map.insert(path.to_path_buf(), ratio);
        }
        ratio
    }

    pub(crate) fn page_count(
        &self,
        path: &Path,
        count: impl FnOnce() -> Result<u32, RasterError>,
    ) -> u32 {
        if let Some(n) = self
            .page_counts
            .lock()
            .ok()
            .and_then(|m| m.get(path).copied())
        {
            return n;
        }
        let n = count_or_fallback(count());
        if let Ok(mut map) = self.page_counts.lock() {
            map.insert(path.to_path_buf(), n);
        }
        n
    }
}

/// First-page geometry and length of one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageInfo {
    /// Number of pages (`1` when unknown)
    pub page_count: u32,
    /// First page height divided by width (√2 when unknown)
    pub height_over_width: f64,
}

impl PageInfo {
    /// Measure `path` through the degrading rasterizer methods.
    #[must_use]
    pub fn measure(rasterizer: &dyn Rasterizer, path: &Path) -> Self {
        Self {
            page_count: rasterizer.page_count(path),
            height_over_width: rasterizer.height_over_width(path),
        }
    }
}

/// Page information keyed by document path.
pub type PageTable = HashMap<PathBuf, PageInfo>;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Routes each document to the PDF or image rasterizer by extension.
#[derive(Debug, Default)]
pub struct DocumentRasterizer {
    pdfs: PdfRasterizer,
    images: ImageRasterizer,
}

impl DocumentRasterizer {
    /// Create a rasterizer for every [`SUPPORTED_EXTENSIONS`] entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pick(&self, path: &Path) -> Result<&dyn Rasterizer, RasterError> {
        if has_extension(path, PDF_EXTENSIONS) {
            Ok(&self.pdfs)
        } else if has_extension(path, IMAGE_EXTENSIONS) {
            Ok(&self.images)
        } else {
            Err(RasterError::Unsupported(path.to_path_buf()))
        }
    }
}

impl Rasterizer for DocumentRasterizer {
    fn try_render(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, RasterError> {
        self.pick(path)?.try_render(path, max_width, max_height)
    }

    fn try_page_size(&self, path: &Path) -> Result<(f64, f64), RasterError> {
        self.pick(path)?.try_page_size(path)
    }

    fn try_page_count(&self, path: &Path) -> Result<u32, RasterError> {
        self.pick(path)?.try_page_count(path)
    }

    fn height_over_width(&self, path: &Path) -> f64 {
        match self.pick(path) {
            Ok(inner) => inner.height_over_width(path),
            Err(e) => ratio_or_fallback(Err(e)),
        }
    }

    fn page_count(&self, path: &Path) -> u32 {
        match self.pick(path) {
            Ok(inner) => inner.page_count(path),
            Err(e) => count_or_fallback(Err(e)),
        }
    }
}
