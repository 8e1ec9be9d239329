//! Change detection — grayscale pixel-difference scoring between frames.

use crate::capture::Frame;
use image::Rgba;
use thiserror::Error;

/// Count of pixels whose intensity changed beyond the noise floor.
pub type DifferenceScore = u64;

/// Per-pixel luma delta a pixel must exceed to count as changed.
/// Filters sensor/compression noise out of the aggregate count.
pub const NOISE_FLOOR: u8 = 25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("frame dimensions differ: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        a_width: u32,
        a_height: u32,
        b_width: u32,
        b_height: u32,
    },
}

/// Integer ITU-R BT.601 luma. Alpha is ignored; captures are opaque.
fn luma(px: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = px.0;
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

/// Score the change between two frames of identical dimensions: the count of
/// pixels whose luma delta exceeds [`NOISE_FLOOR`]. Never resizes or crops —
/// mismatched dimensions are the caller's problem to resolve.
pub fn diff(a: &Frame, b: &Frame) -> Result<DifferenceScore, DiffError> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(DiffError::DimensionMismatch {
            a_width: a.width(),
            a_height: a.height(),
            b_width: b.width(),
            b_height: b.height(),
        });
    }

    let changed = a
        .pixels()
        .pixels()
        .zip(b.pixels().pixels())
        .filter(|(pa, pb)| luma(pa).abs_diff(luma(pb)) > NOISE_FLOOR)
        .count();

    Ok(changed as u64)
}
