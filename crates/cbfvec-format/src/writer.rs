//! Minimal CBF container writer.
//!
//! Produces a miniCBF-style file (CIF preamble, MIME binary header, marker,
//! byte-offset payload). Used to build fixtures and to round-trip decoded
//! images.

use std::io::Write;
use std::path::Path;

use crate::byte_offset::encode_byte_offset;
use crate::error::{FormatError, FormatResult};
use crate::header::{
    KEY_BINARY_SIZE, KEY_BYTE_ORDER, KEY_ELEMENT_TYPE, KEY_FASTEST_DIMENSION,
    KEY_NUMBER_OF_ELEMENTS, KEY_SECOND_DIMENSION,
};
use crate::image::BINARY_MARKER;

const CBF_VERSION_LINE: &str = "###CBF: VERSION 1.5, cbfvec";
const BINARY_SECTION: &str = "--CIF-BINARY-FORMAT-SECTION--";

/// Builder for byte-offset CBF containers.
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    width: usize,
    height: usize,
    block_name: String,
    comments: Vec<String>,
}

impl ContainerWriter {
    /// Create a writer for a `width` x `height` image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            block_name: "image_1".to_string(),
            comments: Vec::new(),
        }
    }

    /// Set the CIF data block name.
    pub fn block_name(mut self, name: impl Into<String>) -> Self {
        self.block_name = name.into();
        self
    }

    /// Add a `# ...` line to the header contents section.
    pub fn comment(mut self, line: impl Into<String>) -> Self {
        self.comments.push(line.into());
        self
    }

    /// Encode `pixels` into a complete container.
    pub fn write(&self, pixels: &[i32]) -> FormatResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out, pixels)?;
        Ok(out)
    }

    /// Encode `pixels` and write the container to `path`.
    pub fn write_file(&self, path: &Path, pixels: &[i32]) -> FormatResult<()> {
        let bytes = self.write(pixels)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Encode `pixels` into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W, pixels: &[i32]) -> FormatResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FormatError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if pixels.len() != self.width * self.height {
            return Err(FormatError::DimensionMismatch {
                elements: pixels.len(),
                width: self.width,
                height: self.height,
            });
        }

        let payload = encode_byte_offset(pixels)?;

        write!(writer, "{}\r\n\r\n", CBF_VERSION_LINE)?;
        write!(writer, "data_{}\r\n\r\n", self.block_name)?;
        if !self.comments.is_empty() {
            write!(writer, "_array_data.header_contents\r\n;\r\n")?;
            for line in &self.comments {
                write!(writer, "# {}\r\n", line)?;
            }
            write!(writer, ";\r\n\r\n")?;
        }
        write!(writer, "_array_data.data\r\n;\r\n{}\r\n", BINARY_SECTION)?;
        write!(writer, "Content-Type: application/octet-stream;\r\n")?;
        write!(writer, "     conversions=\"x-CBF_BYTE_OFFSET\"\r\n")?;
        write!(writer, "Content-Transfer-Encoding: BINARY\r\n")?;
        write!(writer, "{}: {}\r\n", KEY_BINARY_SIZE, payload.len())?;
        write!(writer, "X-Binary-ID: 1\r\n")?;
        write!(writer, "{}: \"signed 32-bit integer\"\r\n", KEY_ELEMENT_TYPE)?;
        write!(writer, "{}: LITTLE_ENDIAN\r\n", KEY_BYTE_ORDER)?;
        write!(writer, "{}: {}\r\n", KEY_NUMBER_OF_ELEMENTS, pixels.len())?;
        write!(writer, "{}: {}\r\n", KEY_FASTEST_DIMENSION, self.width)?;
        write!(writer, "{}: {}\r\n\r\n", KEY_SECOND_DIMENSION, self.height)?;

        writer.write_all(&BINARY_MARKER)?;
        writer.write_all(&payload)?;

        write!(writer, "\r\n{}--\r\n;\r\n", BINARY_SECTION)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderMap;
    use crate::image::find_marker;

    #[test]
    fn test_header_declares_payload_size() {
        let bytes = ContainerWriter::new(3, 1).write(&[0, 200, -5]).unwrap();
        let marker = find_marker(&bytes).unwrap();
        let map = HeaderMap::parse(&String::from_utf8_lossy(&bytes[..marker]));
        // 1 + (1 + 2) + (1 + 2)
        assert_eq!(map.get(KEY_BINARY_SIZE), Some("7"));
        assert_eq!(map.get("_array_data.data"), Some(";"));
    }

    #[test]
    fn test_comments_survive_as_header_contents() {
        let bytes = ContainerWriter::new(1, 1)
            .comment("Detector: PILATUS 6M")
            .comment("Exposure_time 0.1 s")
            .write(&[0])
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("# Detector: PILATUS 6M\r\n"));
        let marker = find_marker(&bytes).unwrap();
        let map = HeaderMap::parse(&String::from_utf8_lossy(&bytes[..marker]));
        assert!(map.get("Detector").is_none());
    }

    #[test]
    fn test_rejects_wrong_pixel_count() {
        let err = ContainerWriter::new(2, 2).write(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, FormatError::DimensionMismatch { elements: 3, .. }));
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let err = ContainerWriter::new(0, 2).write(&[]).unwrap_err();
        assert!(matches!(err, FormatError::InvalidDimensions { .. }));
    }
}
