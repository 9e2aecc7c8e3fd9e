//! Input discovery.
//!
//! A file path yields exactly that file. A directory yields its immediate
//! regular-file children (no recursion), optionally filtered by extension,
//! sorted by name so that runs are reproducible.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{IngestError, IngestResult};

/// Files found under an input path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Files to ingest.
    pub files: Vec<PathBuf>,
    /// Regular files left out by the extension filter.
    pub skipped: Vec<PathBuf>,
}

/// Lists the files to ingest under `root`.
pub fn discover_files(root: &Path, extension: Option<&str>) -> IngestResult<Discovery> {
    let metadata = std::fs::metadata(root).map_err(|e| IngestError::Discovery {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Ok(Discovery {
            files: vec![root.to_path_buf()],
            skipped: Vec::new(),
        });
    }

    let mut discovery = Discovery::default();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestError::Discovery {
            path: e.path().unwrap_or(root).to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_extension(entry.path(), extension) {
            discovery.files.push(entry.into_path());
        } else {
            discovery.skipped.push(entry.into_path());
        }
    }

    tracing::debug!(
        root = %root.display(),
        files = discovery.files.len(),
        skipped = discovery.skipped.len(),
        "discovered input files"
    );
    Ok(discovery)
}

/// Case-insensitive extension match; `None` accepts every file.
pub fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
    let Some(wanted) = extension else {
        return true;
    };
    let wanted = wanted.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_single_file_bypasses_filter() {
        let tmp = TempDir::new().unwrap();
        let path = touch(tmp.path(), "frame.img");
        let found = discover_files(&path, Some("cbf")).unwrap();
        assert_eq!(found.files, vec![path]);
        assert!(found.skipped.is_empty());
    }

    #[test]
    fn test_directory_is_not_recursive() {
        let tmp = TempDir::new().unwrap();
        let b = touch(tmp.path(), "b.cbf");
        let a = touch(tmp.path(), "a.cbf");
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        touch(&tmp.path().join("nested"), "c.cbf");

        let found = discover_files(tmp.path(), None).unwrap();
        assert_eq!(found.files, vec![a, b]);
    }

    #[test]
    fn test_extension_filter_counts_skipped() {
        let tmp = TempDir::new().unwrap();
        let keep = touch(tmp.path(), "x.CBF");
        let skip = touch(tmp.path(), "notes.txt");

        let found = discover_files(tmp.path(), Some(".cbf")).unwrap();
        assert_eq!(found.files, vec![keep]);
        assert_eq!(found.skipped, vec![skip]);
    }

    #[test]
    fn test_missing_path_is_discovery_error() {
        let tmp = TempDir::new().unwrap();
        let err = discover_files(&tmp.path().join("absent"), None).unwrap_err();
        assert_eq!(err.code(), "INGEST_001");
    }

    #[test]
    fn test_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(discover_files(tmp.path(), None).unwrap(), Discovery::default());
    }
}
