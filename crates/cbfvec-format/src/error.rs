//! Error types for container decoding.

use thiserror::Error;

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while decoding or encoding a CBF container.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The 4-byte binary section marker was not found.
    #[error("binary section marker 0C 1A 04 D5 not found")]
    MarkerNotFound,

    /// A required header attribute is absent or not an integer.
    #[error("missing or non-integer header attribute '{key}'")]
    MissingAttribute {
        /// Header key that could not be read.
        key: String,
    },

    /// Declared element count disagrees with the declared dimensions.
    #[error("element count {elements} does not match {width}x{height}")]
    DimensionMismatch {
        /// Declared number of elements.
        elements: usize,
        /// Declared fastest dimension.
        width: usize,
        /// Declared second dimension.
        height: usize,
    },

    /// A declared dimension is zero.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared fastest dimension.
        width: usize,
        /// Declared second dimension.
        height: usize,
    },

    /// Fewer payload bytes follow the marker than the header declares.
    #[error("binary payload truncated: declared {declared} bytes, {available} available")]
    TruncatedPayload {
        /// Declared payload length in bytes.
        declared: usize,
        /// Bytes actually present after the marker.
        available: usize,
    },

    /// The byte-offset stream ran out before all elements were produced.
    #[error("byte_offset stream truncated at element {index} of {expected}")]
    TruncatedStream {
        /// Index of the element that could not be read.
        index: usize,
        /// Number of elements expected.
        expected: usize,
    },

    /// The byte-offset stream is empty but elements were expected.
    #[error("empty byte_offset stream")]
    EmptyStream,

    /// The header names a compression other than byte-offset.
    #[error("unsupported conversion '{conversion}'")]
    UnsupportedConversion {
        /// Conversion named in the header.
        conversion: String,
    },

    /// A value cannot be represented by the byte-offset encoder.
    #[error("value {value} cannot be stored as the leading absolute byte")]
    Unencodable {
        /// The offending value.
        value: i32,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Creates a missing attribute error.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingAttribute { key: key.into() }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            FormatError::MarkerNotFound => "FORMAT_001",
            FormatError::MissingAttribute { .. } => "FORMAT_002",
            FormatError::DimensionMismatch { .. } => "FORMAT_003",
            FormatError::InvalidDimensions { .. } => "FORMAT_004",
            FormatError::TruncatedPayload { .. } => "FORMAT_005",
            FormatError::TruncatedStream { .. } => "FORMAT_006",
            FormatError::EmptyStream => "FORMAT_007",
            FormatError::UnsupportedConversion { .. } => "FORMAT_008",
            FormatError::Unencodable { .. } => "FORMAT_009",
            FormatError::Io(_) => "FORMAT_010",
        }
    }
}
