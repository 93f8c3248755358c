//! Source file representation.

use std::path::{Path, PathBuf};

use super::{Error, FileKind, Result};

/// A Go file with its content loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Source or test file.
    pub kind: FileKind,
    /// File content as bytes.
    pub content: Vec<u8>,
}

impl SourceFile {
    /// Load a source file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let kind = FileKind::detect(path).ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            message: "not a Go file".to_string(),
        })?;
        let content = std::fs::read(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            content,
        })
    }
}
