//! Rasterizer for still and animated raster image files.
//!
//! Each image file is treated as a document whose first page is the image
//! itself (the first frame for animated GIFs). Aspect ratios and page
//! counts are memoised per path for the lifetime of the rasterizer,
//! fallbacks included, so a broken file is only read once.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage};

use super::{PageMemo, RasterError, Rasterizer};

/// File extensions (lowercase) this rasterizer can open.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "gif", "bmp", "tif", "tiff", "webp"];

/// [`Rasterizer`] backed by the `image` crate.
#[derive(Debug, Default)]
pub struct ImageRasterizer {
    memo: PageMemo,
}

impl ImageRasterizer {
    /// Create a rasterizer with empty memo tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(path: &Path) -> Result<DynamicImage, RasterError> {
        image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => RasterError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => RasterError::Decode {
                path: path.to_path_buf(),
                source: other,
            },
        })
    }

    fn is_gif(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
    }
}

impl Rasterizer for ImageRasterizer {
    fn try_render(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, RasterError> {
        let image = Self::decode(path)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(RasterError::EmptyPage(path.to_path_buf()));
        }
        Ok(image.resize(max_width.max(1), max_height.max(1), FilterType::Triangle))
    }

    fn try_page_size(&self, path: &Path) -> Result<(f64, f64), RasterError> {
        let (w, h) = image::image_dimensions(path).map_err(|source| RasterError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        if w == 0 || h == 0 {
            return Err(RasterError::EmptyPage(path.to_path_buf()));
        }
        Ok((f64::from(w), f64::from(h)))
    }

    fn try_page_count(&self, path: &Path) -> Result<u32, RasterError> {
        if !Self::is_gif(path) {
            // Read the header so unreadable files still report an error.
            self.try_page_size(path)?;
            return Ok(1);
        }

        let file = File::open(path).map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = GifDecoder::new(BufReader::new(file)).map_err(|source| {
            RasterError::Decode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let frames = decoder.into_frames().count();
        Ok(u32::try_from(frames).unwrap_or(u32::MAX).max(1))
    }

    fn height_over_width(&self, path: &Path) -> f64 {
        self.memo.ratio(path, || self.try_page_size(path))
    }

    fn page_count(&self, path: &Path) -> u32 {
        self.memo.page_count(path, || self.try_page_count(path))
    }
}
