//! Full-image decoding.

use std::path::Path;

use crate::byte_offset::decode_byte_offset;
use crate::error::{FormatError, FormatResult};
use crate::header::{HeaderMap, ImageHeader};

/// Bytes that separate the text header from the binary payload.
pub const BINARY_MARKER: [u8; 4] = [0x0c, 0x1a, 0x04, 0xd5];

/// A decoded image: row-major absolute intensities plus dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Pixel intensities, `width * height` long.
    pub pixels: Vec<i32>,
    /// Fastest dimension.
    pub width: usize,
    /// Second dimension.
    pub height: usize,
    /// Header fields the image was decoded with.
    pub header: ImageHeader,
}

impl DecodedImage {
    /// Splits into `(pixels, width, height)`.
    pub fn into_parts(self) -> (Vec<i32>, usize, usize) {
        (self.pixels, self.width, self.height)
    }

    /// Summary statistics over the pixel grid.
    pub fn stats(&self) -> PixelStats {
        PixelStats::compute(&self.pixels)
    }
}

/// Intensity summary of a pixel grid.
///
/// Negative intensities mark detector gaps and bad pixels; they are counted
/// as masked and excluded from min/max/mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    /// Smallest unmasked intensity (0 if every pixel is masked).
    pub min: i32,
    /// Largest unmasked intensity (0 if every pixel is masked).
    pub max: i32,
    /// Mean unmasked intensity.
    pub mean: f64,
    /// Number of negative (masked) pixels.
    pub masked: usize,
}

impl PixelStats {
    /// Computes statistics for a pixel slice.
    pub fn compute(pixels: &[i32]) -> Self {
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        let mut sum = 0i64;
        let mut masked = 0usize;

        for &p in pixels {
            if p < 0 {
                masked += 1;
                continue;
            }
            min = min.min(p);
            max = max.max(p);
            sum += i64::from(p);
        }

        let valid = pixels.len() - masked;
        if valid == 0 {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
                masked,
            };
        }

        Self {
            min,
            max,
            mean: sum as f64 / valid as f64,
            masked,
        }
    }
}

/// Finds the offset of [`BINARY_MARKER`] in `data`.
pub fn find_marker(data: &[u8]) -> Option<usize> {
    data.windows(BINARY_MARKER.len())
        .position(|window| window == BINARY_MARKER)
}

/// Decodes a complete CBF container held in memory.
pub fn decode_image(raw: &[u8]) -> FormatResult<DecodedImage> {
    let marker = find_marker(raw).ok_or(FormatError::MarkerNotFound)?;

    let header_text = String::from_utf8_lossy(&raw[..marker]);
    let header = ImageHeader::from_map(&HeaderMap::parse(&header_text))?;

    if !header.is_byte_offset() {
        return Err(FormatError::UnsupportedConversion {
            conversion: header.conversions.clone().unwrap_or_default(),
        });
    }

    let payload_start = marker + BINARY_MARKER.len();
    let available = raw.len() - payload_start;
    if available < header.binary_size {
        return Err(FormatError::TruncatedPayload {
            declared: header.binary_size,
            available,
        });
    }

    let payload = &raw[payload_start..payload_start + header.binary_size];
    let pixels = decode_byte_offset(payload, header.element_count)?;

    tracing::debug!(
        width = header.width,
        height = header.height,
        payload_bytes = header.binary_size,
        "decoded byte_offset image"
    );

    Ok(DecodedImage {
        pixels,
        width: header.width,
        height: header.height,
        header,
    })
}

/// Reads and decodes a CBF file.
pub fn read_image(path: &Path) -> FormatResult<DecodedImage> {
    let raw = std::fs::read(path)?;
    decode_image(&raw)
}
