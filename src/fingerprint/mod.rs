//! Perceptual fingerprinting of a document's first page.
//!
//! This module reduces a rendered first page to a 64-bit [`Fingerprint`]
//! that stays stable under small rendering differences (anti-aliasing,
//! scaling, compression noise), so visually similar documents end up with
//! fingerprints at a small Hamming distance.
//!
//! # Algorithms
//!
//! * [`dct`]: pHash - 32×32 grayscale grid, separable 2-D DCT-II, the 63
//!   low-frequency AC coefficients thresholded against their median.
//! * [`average`]: aHash - 8×8 grayscale grid thresholded against its mean.
//!   Used only when the perceptual hash comes out as zero.
//!
//! # Unknown fingerprints
//!
//! Fingerprinting never fails outward. When no raster is available the
//! result carries the sentinel value `0` together with
//! [`Method::Unavailable`], so callers can tell "unknown" apart from a real
//! bit pattern without inspecting the value.

pub mod average;
pub mod dct;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::raster::Rasterizer;

/// Side of the bounding box the first page is rendered into before hashing.
pub const HASH_RENDER_SIZE: u32 = 64;

/// A 64-bit similarity fingerprint.
///
/// Ordering is plain unsigned integer ordering, which the similarity
/// sorter relies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// The sentinel used for documents whose fingerprint is unknown.
    pub const UNKNOWN: Fingerprint = Fingerprint(0);

    /// Wrap a raw 64-bit value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw bit pattern.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Number of differing bits between two fingerprints.
    #[must_use]
    pub const fn distance(self, other: Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Whether this is the `0` sentinel.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Fixed-width lowercase hex rendering.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Which algorithm produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// DCT-based perceptual hash.
    Perceptual,
    /// Mean-threshold average hash (fallback).
    Average,
    /// No raster could be produced; the value is the `0` sentinel.
    Unavailable,
}

impl Method {
    /// Stable name used in cache records and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perceptual => "perceptual",
            Self::Average => "average",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perceptual" => Ok(Self::Perceptual),
            "average" => Ok(Self::Average),
            "unavailable" => Ok(Self::Unavailable),
            other => Err(format!("unknown fingerprint method: '{other}'")),
        }
    }
}

/// A fingerprint together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintResult {
    /// The fingerprint bits (`0` when unavailable).
    pub value: Fingerprint,
    /// The algorithm that produced `value`.
    pub method: Method,
}

impl FingerprintResult {
    /// Result for a document that could not be fingerprinted.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            value: Fingerprint::UNKNOWN,
            method: Method::Unavailable,
        }
    }

    /// Whether the fingerprint reflects actual page content.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.method != Method::Unavailable
    }
}

/// Compute the fingerprint of a rendered first page.
///
/// Runs the perceptual hash first and falls back to the average hash when
/// the perceptual hash is zero. A missing or empty raster yields
/// [`FingerprintResult::unavailable`]. Deterministic for a fixed raster.
#[must_use]
pub fn compute_fingerprint(raster: Option<&DynamicImage>) -> FingerprintResult {
    let Some(image) = raster else {
        return FingerprintResult::unavailable();
    };

    let phash = dct::perceptual_hash(image);
    if phash != 0 {
        return FingerprintResult {
            value: Fingerprint(phash),
            method: Method::Perceptual,
        };
    }

    let ahash = average::average_hash(image);
    if ahash != 0 {
        log::trace!("Perceptual hash degenerate, using average hash");
        return FingerprintResult {
            value: Fingerprint(ahash),
            method: Method::Average,
        };
    }

    FingerprintResult::unavailable()
}

/// Render the first page of `path` and fingerprint it.
#[must_use]
pub fn fingerprint_document(rasterizer: &dyn Rasterizer, path: &Path) -> FingerprintResult {
    let raster = rasterizer.render(path, HASH_RENDER_SIZE, HASH_RENDER_SIZE);
    let result = compute_fingerprint(raster.as_ref());
    if !result.is_valid() {
        log::debug!("No fingerprint for {}", path.display());
    }
    result
}

/// Reduce an image to a `side`×`side` grid of grayscale intensities.
///
/// Grayscale is the unweighted mean of the three colour channels; the
/// downsample uses a triangle (bilinear) filter. Returns `None` for
/// images with no pixels.
pub(crate) fn gray_grid(image: &DynamicImage, side: u32) -> Option<Vec<f32>> {
    if image.width() == 0 || image.height() == 0 || side == 0 {
        return None;
    }

    let rgb = image.to_rgb8();
    let gray: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            Luma([(f32::from(r) + f32::from(g) + f32::from(b)) / 3.0])
        });

    let small = imageops::resize(&gray, side, side, FilterType::Triangle);
    Some(small.into_raw())
}
