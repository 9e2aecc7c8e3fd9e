//! cbfvec CBF container format
//!
//! This crate reads CIF Binary Format (CBF) images as written by photon
//! counting diffraction detectors. A container is an ASCII header, a fixed
//! 4-byte marker (`0C 1A 04 D5`), and a byte-offset compressed payload of
//! signed 32-bit intensities.
//!
//! # Example
//!
//! ```
//! use cbfvec_format::{decode_image, ContainerWriter};
//!
//! let pixels = vec![5, 6, 7, 1000, -1, 0];
//! let bytes = ContainerWriter::new(3, 2).write(&pixels).unwrap();
//!
//! let image = decode_image(&bytes).unwrap();
//! assert_eq!((image.width, image.height), (3, 2));
//! assert_eq!(image.pixels, pixels);
//! ```
//!
//! # Modules
//!
//! - [`header`]: text header parsing into attribute maps
//! - [`byte_offset`]: delta compression with 8/16/32-bit escalation
//! - [`image`]: marker location, payload slicing, and full decode
//! - [`writer`]: container writer for fixtures and round-trips

pub mod byte_offset;
pub mod error;
pub mod header;
pub mod image;
pub mod writer;

pub use byte_offset::{decode_byte_offset, encode_byte_offset, write_byte_offset};
pub use error::{FormatError, FormatResult};
pub use header::{HeaderMap, ImageHeader};
pub use image::{decode_image, find_marker, read_image, DecodedImage, PixelStats, BINARY_MARKER};
pub use writer::ContainerWriter;
