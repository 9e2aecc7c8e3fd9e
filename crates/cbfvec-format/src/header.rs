//! Text header parsing.
//!
//! The preamble of a CBF file mixes three kinds of lines: MIME-style
//! `key: value` pairs, space-delimited `X-Binary-*` attributes, and CIF tags
//! starting with `_` whose value may sit on the following line. Parsing never
//! fails; callers decide which keys are required.

use std::collections::HashMap;

use crate::error::{FormatError, FormatResult};

/// Header key for the fastest-varying dimension (image width).
pub const KEY_FASTEST_DIMENSION: &str = "X-Binary-Size-Fastest-Dimension";
/// Header key for the second dimension (image height).
pub const KEY_SECOND_DIMENSION: &str = "X-Binary-Size-Second-Dimension";
/// Header key for the number of encoded elements.
pub const KEY_NUMBER_OF_ELEMENTS: &str = "X-Binary-Number-of-Elements";
/// Header key for the payload length in bytes.
pub const KEY_BINARY_SIZE: &str = "X-Binary-Size";
/// Header key for the element type description.
pub const KEY_ELEMENT_TYPE: &str = "X-Binary-Element-Type";
/// Header key for the element byte order.
pub const KEY_BYTE_ORDER: &str = "X-Binary-Element-Byte-Order";
/// Header key for the MIME content type.
pub const KEY_CONTENT_TYPE: &str = "Content-Type";
/// Header key for the payload MD5 digest.
pub const KEY_CONTENT_MD5: &str = "Content-MD5";
/// Key under which the `conversions="..."` continuation line is stored.
pub const KEY_CONVERSIONS: &str = "conversions";

/// Attribute name to value mapping built from a header preamble.
///
/// Keys are case-sensitive. Later lines overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    /// Parses header text into a map.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        let lines: Vec<&str> = text.split('\n').collect();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;

            if line.is_empty() || line.starts_with('#') || line == "loop_" || line == ";" {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                entries.insert(
                    key.trim().to_string(),
                    value.trim().trim_matches('"').to_string(),
                );
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();

            if fields.len() >= 2 && fields[0].starts_with("X-Binary-") {
                entries.insert(fields[0].to_string(), fields[1].trim_matches('"').to_string());
                continue;
            }

            if let Some(value) = line.strip_prefix("conversions=") {
                entries.insert(
                    KEY_CONVERSIONS.to_string(),
                    value.trim().trim_matches('"').to_string(),
                );
                continue;
            }

            if line.starts_with('_') {
                if fields.len() > 1 {
                    entries.insert(fields[0].to_string(), fields[1].to_string());
                } else if let Some(next) = lines.get(i).map(|l| l.trim()) {
                    if !next.is_empty() && !next.starts_with('_') {
                        entries.insert(fields[0].to_string(), next.to_string());
                        i += 1;
                    }
                }
            }
        }

        Self { entries }
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns a key's value parsed as a non-negative integer.
    pub fn get_usize(&self, key: &str) -> FormatResult<usize> {
        self.get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or_else(|| FormatError::missing(key))
    }

    /// Number of parsed attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attributes were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over attributes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The header fields needed to decode an image, extracted from a [`HeaderMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// Fastest-varying dimension.
    pub width: usize,
    /// Second dimension.
    pub height: usize,
    /// Declared number of elements.
    pub element_count: usize,
    /// Declared payload length in bytes.
    pub binary_size: usize,
    /// Compression named by the `conversions` attribute, if any.
    pub conversions: Option<String>,
    /// MIME content type line, if any.
    pub content_type: Option<String>,
    /// Declared element type, if any.
    pub element_type: Option<String>,
    /// Declared element byte order, if any.
    pub byte_order: Option<String>,
    /// Declared payload digest, if any.
    pub content_md5: Option<String>,
}

impl ImageHeader {
    /// Extracts and checks the required attributes.
    pub fn from_map(map: &HeaderMap) -> FormatResult<Self> {
        let width = map.get_usize(KEY_FASTEST_DIMENSION)?;
        let height = map.get_usize(KEY_SECOND_DIMENSION)?;
        let element_count = map.get_usize(KEY_NUMBER_OF_ELEMENTS)?;
        let binary_size = map.get_usize(KEY_BINARY_SIZE)?;

        if width == 0 || height == 0 {
            return Err(FormatError::InvalidDimensions { width, height });
        }

        if width.checked_mul(height) != Some(element_count) {
            return Err(FormatError::DimensionMismatch {
                elements: element_count,
                width,
                height,
            });
        }

        let optional = |key: &str| map.get(key).map(str::to_string);

        Ok(Self {
            width,
            height,
            element_count,
            binary_size,
            conversions: optional(KEY_CONVERSIONS),
            content_type: optional(KEY_CONTENT_TYPE),
            element_type: optional(KEY_ELEMENT_TYPE),
            byte_order: optional(KEY_BYTE_ORDER),
            content_md5: optional(KEY_CONTENT_MD5),
        })
    }

    /// Whether the header allows byte-offset decoding.
    ///
    /// A missing `conversions` attribute is accepted.
    pub fn is_byte_offset(&self) -> bool {
        self.conversions
            .as_deref()
            .map(|c| c.to_ascii_uppercase().contains("BYTE_OFFSET"))
            .unwrap_or(true)
    }
}
