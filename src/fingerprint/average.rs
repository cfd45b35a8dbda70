//! Average hash (aHash), the fallback fingerprint.

use image::DynamicImage;

use super::gray_grid;

/// Side of the grayscale grid; 8×8 cells give 64 bits.
pub const GRID_SIDE: u32 = 8;

/// Cells within this many gray levels below the mean still count as bright.
pub const MEAN_TOLERANCE: f64 = 1e-3;

/// Compute the average hash of an image.
///
/// Each of the 64 cells contributes one bit, `1` when the cell is at
/// least as bright as the mean, scanned row-major with the first cell in
/// the most significant bit. Resampling residue is absorbed by
/// [`MEAN_TOLERANCE`], so a flat page always hashes to `u64::MAX`.
/// Returns `0` for an empty image.
#[must_use]
pub fn average_hash(image: &DynamicImage) -> u64 {
    let Some(cells) = gray_grid(image, GRID_SIDE) else {
        return 0;
    };
    mean_bits(&cells)
}

pub(crate) fn mean_bits(cells: &[f32]) -> u64 {
    if cells.is_empty() {
        return 0;
    }
    let mean = cells.iter().map(|&c| f64::from(c)).sum::<f64>() / cells.len() as f64;
    cells
        .iter()
        .fold(0u64, |hash, &c| {
            (hash << 1) | u64::from(f64::from(c) + MEAN_TOLERANCE >= mean)
        })
}
