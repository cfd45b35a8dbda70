//! Rasterizer for PDF documents.
//!
//! Page geometry and page counts come from the document structure parsed
//! with `lopdf`, without rendering anything. The first page is rendered
//! with `hayro`, a pure-Rust PDF renderer, so no system library is needed.
//!
//! Geometry follows the PDF page model: the visible area is the `CropBox`
//! (falling back to the `MediaBox`), both attributes may be inherited from
//! an ancestor `Pages` node, and a `Rotate` of 90 or 270 degrees swaps the
//! width and height.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object};

use super::{PageMemo, RasterError, Rasterizer};

/// File extensions (lowercase) this rasterizer can open.
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Deepest `Parent` chain followed when looking up inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// [`Rasterizer`] for PDF files.
#[derive(Debug, Default)]
pub struct PdfRasterizer {
    memo: PageMemo,
}

impl PdfRasterizer {
    /// Create a rasterizer with empty memo tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(path: &Path) -> Result<Vec<u8>, RasterError> {
        fs::read(path).map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(path: &Path, bytes: &[u8]) -> Result<Document, RasterError> {
        Document::load_mem(bytes).map_err(|e| pdf_error(path, e))
    }

    fn first_page_size(path: &Path, doc: &Document) -> Result<(f64, f64), RasterError> {
        let page_id = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or_else(|| pdf_error(path, "document has no pages"))?;
        let page = doc.get_dictionary(page_id).map_err(|e| pdf_error(path, e))?;

        let rect = inherited(doc, page, b"CropBox")
            .and_then(|obj| rectangle(doc, obj))
            .or_else(|| inherited(doc, page, b"MediaBox").and_then(|obj| rectangle(doc, obj)))
            .ok_or_else(|| pdf_error(path, "first page has no MediaBox"))?;

        let (llx, lly, urx, ury) = rect;
        let (width, height) = ((urx - llx).abs(), (ury - lly).abs());
        if width == 0.0 || height == 0.0 {
            return Err(RasterError::EmptyPage(path.to_path_buf()));
        }

        let rotate = inherited(doc, page, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        if rotate.rem_euclid(180) == 90 {
            Ok((height, width))
        } else {
            Ok((width, height))
        }
    }
}

impl Rasterizer for PdfRasterizer {
    fn try_render(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, RasterError> {
        let (max_width, max_height) = (max_width.max(1), max_height.max(1));
        let bytes = Self::read(path)?;

        let scale = Self::parse(path, &bytes)
            .and_then(|doc| Self::first_page_size(path, &doc))
            .map(|(w, h)| (f64::from(max_width) / w).min(f64::from(max_height) / h))
            .unwrap_or(1.0) as f32;

        let pdf = Pdf::new(Arc::new(bytes)).map_err(|e| pdf_error(path, format!("{:?}", e)))?;
        let page = pdf
            .pages()
            .iter()
            .next()
            .ok_or_else(|| pdf_error(path, "document has no pages"))?;

        let settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            ..Default::default()
        };
        let png = hayro::render(page, &InterpreterSettings::default(), &settings).take_png();
        let rendered = image::load_from_memory(&png).map_err(|source| RasterError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        if rendered.width() == 0 || rendered.height() == 0 {
            return Err(RasterError::EmptyPage(path.to_path_buf()));
        }

        let page = DynamicImage::ImageRgb8(flatten_on_white(&rendered));
        Ok(page.resize(max_width, max_height, FilterType::Triangle))
    }

    fn try_page_size(&self, path: &Path) -> Result<(f64, f64), RasterError> {
        let bytes = Self::read(path)?;
        let doc = Self::parse(path, &bytes)?;
        Self::first_page_size(path, &doc)
    }

    fn try_page_count(&self, path: &Path) -> Result<u32, RasterError> {
        let bytes = Self::read(path)?;
        let doc = Self::parse(path, &bytes)?;
        match doc.get_pages().len() {
            0 => Err(pdf_error(path, "document has no pages")),
            n => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }

    fn height_over_width(&self, path: &Path) -> f64 {
        self.memo.ratio(path, || self.try_page_size(path))
    }

    fn page_count(&self, path: &Path) -> u32 {
        self.memo.page_count(path, || self.try_page_count(path))
    }
}

fn pdf_error(path: &Path, message: impl ToString) -> RasterError {
    RasterError::Pdf {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn rectangle(doc: &Document, obj: &Object) -> Option<(f64, f64, f64, f64)> {
    let items = obj.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut values = [0.0; 4];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = resolve(doc, item).and_then(number)?;
    }
    Some((values[0], values[1], values[2], values[3]))
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u32::from(a);
        let over = |c: u8| ((u32::from(c) * a + 255 * (255 - a)) / 255) as u8;
        Rgb([over(r), over(g), over(b)])
    })
}
