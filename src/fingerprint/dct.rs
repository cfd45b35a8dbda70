//! DCT-based perceptual hash (pHash).
//!
//! Steps:
//! 1. Reduce the raster to a 32×32 grayscale grid.
//! 2. Separable 2-D DCT-II: rows first, then columns, each scaled by
//!    √½ for the zero frequency and 1 otherwise.
//! 3. Keep the top-left 8×8 block of coefficients minus the DC cell.
//! 4. Emit one bit per coefficient, `1` when it exceeds the median of the
//!    63, scanning the block row-major. The first coefficient ends up in
//!    the most significant of the 63 used bits.
//!
//! # Flat pages
//!
//! A page of a single colour has no AC energy, but resampling and the
//! cosine sums leave rounding residue in the coefficients. Coefficients
//! smaller than [`NOISE_FLOOR`] times the DC magnitude are treated as zero
//! before thresholding, so every flat page (white, grey or black) hashes to
//! `0` and the caller falls back to the average hash.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::OnceLock;

use image::DynamicImage;

use super::gray_grid;

/// Side of the grayscale grid fed to the DCT.
pub const GRID_SIDE: usize = 32;

/// Side of the low-frequency block used for the hash.
pub const BLOCK_SIDE: usize = 8;

/// Number of coefficients (and therefore significant bits) in the hash.
pub const COEFFICIENTS: usize = BLOCK_SIDE * BLOCK_SIDE - 1;

/// AC coefficients below this fraction of the DC magnitude count as zero.
pub const NOISE_FLOOR: f64 = 1e-4;

static COS_TABLE: OnceLock<Vec<f64>> = OnceLock::new();

/// `cos((2x + 1) u π / 2N)` laid out as `table[u * N + x]`.
fn cos_table() -> &'static [f64] {
    COS_TABLE.get_or_init(|| {
        let n = GRID_SIDE as f64;
        let mut table = Vec::with_capacity(GRID_SIDE * GRID_SIDE);
        for u in 0..GRID_SIDE {
            for x in 0..GRID_SIDE {
                table.push((((2 * x + 1) * u) as f64 * PI / (2.0 * n)).cos());
            }
        }
        table
    })
}

fn alpha(u: usize) -> f64 {
    if u == 0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// 2-D DCT-II of a `GRID_SIDE`² grid stored row-major.
///
/// The output is indexed `[v * GRID_SIDE + u]` where `u` is the horizontal
/// and `v` the vertical frequency.
pub(crate) fn dct_2d(grid: &[f64]) -> Vec<f64> {
    debug_assert_eq!(grid.len(), GRID_SIDE * GRID_SIDE);
    let cos = cos_table();

    let mut rows = vec![0.0; GRID_SIDE * GRID_SIDE];
    for y in 0..GRID_SIDE {
        let row = &grid[y * GRID_SIDE..(y + 1) * GRID_SIDE];
        for u in 0..GRID_SIDE {
            let basis = &cos[u * GRID_SIDE..(u + 1) * GRID_SIDE];
            let sum: f64 = row.iter().zip(basis).map(|(g, c)| g * c).sum();
            rows[y * GRID_SIDE + u] = alpha(u) * sum;
        }
    }

    let mut out = vec![0.0; GRID_SIDE * GRID_SIDE];
    for u in 0..GRID_SIDE {
        for v in 0..GRID_SIDE {
            let basis = &cos[v * GRID_SIDE..(v + 1) * GRID_SIDE];
            let sum: f64 = (0..GRID_SIDE)
                .map(|y| rows[y * GRID_SIDE + u] * basis[y])
                .sum();
            out[v * GRID_SIDE + u] = alpha(v) * sum;
        }
    }
    out
}

/// The 63 low-frequency AC coefficients in hash bit order, with rounding
/// residue flushed to zero.
pub(crate) fn low_frequency_block(coeffs: &[f64]) -> Vec<f64> {
    let floor = NOISE_FLOOR * coeffs[0].abs().max(1.0);
    let mut block = Vec::with_capacity(COEFFICIENTS);
    for v in 0..BLOCK_SIDE {
        for u in 0..BLOCK_SIDE {
            if u == 0 && v == 0 {
                continue;
            }
            let c = coeffs[v * GRID_SIDE + u];
            block.push(if c.abs() < floor { 0.0 } else { c });
        }
    }
    block
}

/// Threshold coefficients against their median, first coefficient first.
pub(crate) fn median_bits(block: &[f64]) -> u64 {
    if block.is_empty() {
        return 0;
    }
    let mut sorted = block.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = sorted[sorted.len() / 2];

    block
        .iter()
        .fold(0u64, |hash, &c| (hash << 1) | u64::from(c > median))
}

/// Compute the perceptual hash of an image.
///
/// `0` when the image is empty or flat.
#[must_use]
pub fn perceptual_hash(image: &DynamicImage) -> u64 {
    let Some(grid) = gray_grid(image, GRID_SIDE as u32) else {
        return 0;
    };
    let grid: Vec<f64> = grid.into_iter().map(f64::from).collect();
    let coeffs = dct_2d(&grid);
    median_bits(&low_frequency_block(&coeffs))
}
