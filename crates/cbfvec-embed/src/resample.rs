//! Intensity conditioning and bilinear resampling.

/// Upper bound of the intensity range fed to the resampler.
pub const MAX_INTENSITY: f32 = 255.0;

/// Clamp raw detector counts into `[0, MAX_INTENSITY]`.
///
/// Negative values (gaps, dead pixels) become zero and hot pixels saturate,
/// so no value wraps the way an unchecked byte cast would.
pub fn clamp_intensities(pixels: &[i32]) -> Vec<f32> {
    pixels
        .iter()
        .map(|&p| (p.max(0) as f32).min(MAX_INTENSITY))
        .collect()
}

/// Resample a `width` x `height` grid to `size` x `size` using bilinear
/// interpolation.
///
/// Source coordinates are `dst * (src_len / size)`, anchored at the top-left
/// corner; neighbours past the last row or column clamp to the edge.
///
/// # Arguments
/// * `src` - Row-major source values, `width * height` long
/// * `width` - Source width
/// * `height` - Source height
/// * `size` - Destination edge length
pub fn resize_bilinear(src: &[f32], width: usize, height: usize, size: usize) -> Vec<f32> {
    let mut dst = vec![0.0f32; size * size];

    let sx = width as f64 / size as f64;
    let sy = height as f64 / size as f64;

    for y in 0..size {
        let fy = y as f64 * sy;
        let y0 = (fy.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let wy = fy - y0 as f64;

        for x in 0..size {
            let fx = x as f64 * sx;
            let x0 = (fx.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let wx = fx - x0 as f64;

            let v00 = src[y0 * width + x0] as f64;
            let v01 = src[y0 * width + x1] as f64;
            let v10 = src[y1 * width + x0] as f64;
            let v11 = src[y1 * width + x1] as f64;

            let top = v00 * (1.0 - wx) + v01 * wx;
            let bottom = v10 * (1.0 - wx) + v11 * wx;
            dst[y * size + x] = (top * (1.0 - wy) + bottom * wy) as f32;
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clamp_intensities() {
        assert_eq!(
            clamp_intensities(&[-5, 0, 17, 255, 70000]),
            vec![0.0, 0.0, 17.0, 255.0, 255.0]
        );
    }

    #[test]
    fn test_identity_resize() {
        let src: Vec<f32> = (0..16).map(|v| v as f32).collect();
        assert_eq!(resize_bilinear(&src, 4, 4, 4), src);
    }

    #[test]
    fn test_downsample_picks_top_left_anchors() {
        // 4x4 -> 2x2 samples at source (0,0), (2,0), (0,2), (2,2)
        let src: Vec<f32> = (0..16).map(|v| v as f32).collect();
        assert_eq!(resize_bilinear(&src, 4, 4, 2), vec![0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn test_upsample_interpolates() {
        // 2x1 -> 4x4: columns sample at 0, 0.5, 1.0, 1.5 (clamped to edge)
        let out = resize_bilinear(&[0.0, 10.0], 2, 1, 4);
        assert_eq!(&out[0..4], &[0.0, 5.0, 10.0, 10.0]);
        assert_eq!(&out[12..16], &[0.0, 5.0, 10.0, 10.0]);
    }

    #[test]
    fn test_constant_grid_stays_constant() {
        let src = vec![42.0f32; 7 * 3];
        let out = resize_bilinear(&src, 7, 3, 5);
        assert!(out.iter().all(|&v| (v - 42.0).abs() < 1e-4));
    }

    #[test]
    fn test_non_square_source() {
        let src: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let out = resize_bilinear(&src, 3, 2, 3);
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], 0.0);
    }
}
