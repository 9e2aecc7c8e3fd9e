//! Pixel grid to unit-norm vector.

use crate::error::{EmbedError, EmbedResult};
use crate::resample::{clamp_intensities, resize_bilinear, MAX_INTENSITY};

/// Default edge length of the resampled grid.
pub const DEFAULT_TARGET_SIZE: usize = 224;

/// Added to the L2 norm before dividing, so an all-zero image stays finite.
pub const NORM_EPSILON: f64 = 1e-8;

/// Deterministic pixel embedder.
///
/// Pipeline: clamp to `[0, 255]`, bilinear resize to `target_size` squared,
/// scale by `1/255`, flatten row-major, L2-normalise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEmbedder {
    target_size: usize,
}

impl FeatureEmbedder {
    /// Create an embedder producing `target_size * target_size` vectors.
    pub fn new(target_size: usize) -> EmbedResult<Self> {
        if target_size == 0 {
            return Err(EmbedError::ZeroTargetSize);
        }
        Ok(Self { target_size })
    }

    /// Edge length of the resampled grid.
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Length of produced vectors.
    pub fn dimension(&self) -> usize {
        self.target_size * self.target_size
    }

    /// Embed a row-major `width` x `height` grid.
    pub fn embed(&self, pixels: &[i32], width: usize, height: usize) -> EmbedResult<Vec<f32>> {
        if width == 0 || height == 0 {
            return Err(EmbedError::EmptyImage { width, height });
        }
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(EmbedError::GridSizeMismatch {
                len: pixels.len(),
                width,
                height,
            });
        }

        let clamped = clamp_intensities(pixels);
        let mut vector = resize_bilinear(&clamped, width, height, self.target_size);
        for v in vector.iter_mut() {
            *v /= MAX_INTENSITY;
        }
        l2_normalize(&mut vector);

        Ok(vector)
    }
}

/// Divide every element by `sqrt(sum of squares) + NORM_EPSILON`.
pub fn l2_normalize(vector: &mut [f32]) {
    let sum_sq: f64 = vector.iter().map(|&v| (v as f64) * (v as f64)).sum();
    let norm = sum_sq.sqrt() + NORM_EPSILON;
    for v in vector.iter_mut() {
        *v = (*v as f64 / norm) as f32;
    }
}

/// One-shot helper: embed `pixels` at `target_size`.
pub fn embed_pixels(
    pixels: &[i32],
    width: usize,
    height: usize,
    target_size: usize,
) -> EmbedResult<Vec<f32>> {
    FeatureEmbedder::new(target_size)?.embed(pixels, width, height)
}

/// L2 norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&v| (v as f64) * (v as f64))
        .sum::<f64>()
        .sqrt()
}
