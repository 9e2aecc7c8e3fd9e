//! Test fixture utilities for creating synthetic CBF directories.

use std::fs;
use std::path::{Path, PathBuf};

use cbfvec_format::{ContainerWriter, BINARY_MARKER};
use tempfile::TempDir;

/// A temporary directory populated with CBF containers.
pub struct ContainerFixture {
    pub root: TempDir,
}

impl Default for ContainerFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerFixture {
    /// Create a new empty fixture directory.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        Self { root }
    }

    /// Get the fixture directory path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write a container holding `pixels`.
    pub fn add_image(&self, name: &str, width: usize, height: usize, pixels: &[i32]) -> PathBuf {
        let path = self.root.path().join(name);
        ContainerWriter::new(width, height)
            .comment(format!("fixture {}", name))
            .write_file(&path, pixels)
            .expect("Failed to write container");
        path
    }

    /// Write a container with a deterministic pattern exercising every
    /// delta width.
    pub fn add_pattern(&self, name: &str, width: usize, height: usize, seed: i32) -> PathBuf {
        self.add_image(name, width, height, &pattern_pixels(width, height, seed))
    }

    /// Write `count` pattern images named `frame_000.cbf`, `frame_001.cbf`, ...
    pub fn add_frames(&self, count: usize, width: usize, height: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| self.add_pattern(&format!("frame_{:03}.cbf", i), width, height, i as i32))
            .collect()
    }

    /// Write a file with no binary marker.
    pub fn add_corrupt(&self, name: &str) -> PathBuf {
        self.add_file(name, b"###CBF: VERSION 1.5\r\n\r\ndata_broken\r\n")
    }

    /// Write a container whose payload is shorter than its header claims.
    pub fn add_truncated(&self, name: &str, width: usize, height: usize) -> PathBuf {
        let bytes = ContainerWriter::new(width, height)
            .write(&pattern_pixels(width, height, 0))
            .expect("Failed to encode container");
        let marker = cbfvec_format::find_marker(&bytes).expect("writer emits a marker");
        let cut = (marker + BINARY_MARKER.len() + 1).min(bytes.len());
        self.add_file(name, &bytes[..cut])
    }

    /// Write arbitrary bytes.
    pub fn add_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, bytes).expect("Failed to write fixture file");
        path
    }
}

/// Deterministic pixels with small, 16-bit, and 32-bit steps plus masked
/// (negative) values. The first pixel always fits in a signed byte.
pub fn pattern_pixels(width: usize, height: usize, seed: i32) -> Vec<i32> {
    (0..width * height)
        .map(|i| {
            let i = i as i32;
            match i % 7 {
                0 => (seed + i) % 100,
                1 => 40_000 + seed * 13 + i,
                2 => -1,
                3 => 200 + i,
                4 => 2_000_000 - i,
                5 => 255,
                _ => (i * 31 + seed) % 1_000,
            }
        })
        .collect()
}

/// Assemble a container by hand from header lines and a raw payload.
pub fn raw_container(header_lines: &[String], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for line in header_lines {
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }
    bytes.extend_from_slice(b"\r\n");
    bytes.extend_from_slice(&BINARY_MARKER);
    bytes.extend_from_slice(payload);
    bytes
}

/// Standard header lines for a byte-offset container.
pub fn header_lines(width: usize, height: usize, elements: usize, binary_size: usize) -> Vec<String> {
    vec![
        "###CBF: VERSION 1.5".to_string(),
        "Content-Type: application/octet-stream;".to_string(),
        "     conversions=\"x-CBF_BYTE_OFFSET\"".to_string(),
        format!("X-Binary-Size: {}", binary_size),
        format!("X-Binary-Number-of-Elements: {}", elements),
        format!("X-Binary-Size-Fastest-Dimension: {}", width),
        format!("X-Binary-Size-Second-Dimension: {}", height),
    ]
}
