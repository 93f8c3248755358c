//! File set for collecting Go files to analyze.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::file_kind::{is_skipped_dir, FileKind};
use super::{Error, Result};
use crate::config::Config;

/// A set of Go files to analyze, respecting .gitignore.
#[derive(Debug, Clone)]
pub struct FileSet {
    /// Root directory.
    root: PathBuf,
    /// All files in the set, sorted.
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Create a file set from a directory path.
    pub fn from_path(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Self::from_path_with_patterns(path, &config.exclude_patterns)
    }

    /// Create a file set with custom exclude patterns.
    ///
    /// Hidden entries, `vendor/` and `testdata/` are always skipped. Any
    /// error while walking the tree aborts the scan.
    pub fn from_path_with_patterns(
        path: impl AsRef<Path>,
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let root = path.as_ref().canonicalize()?;
        let excludes = build_glob_set(exclude_patterns)?;
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                !is_skipped_dir(&entry.file_name().to_string_lossy())
            })
            .build();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type().is_some_and(|t| t.is_dir()) {
                continue;
            }

            if FileKind::detect(path).is_none() {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if excludes.is_match(relative) || excludes.is_match(path) {
                tracing::debug!("Excluded by pattern: {}", relative.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        // Sort for deterministic ordering
        files.sort();

        Ok(Self { root, files })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get all files in the set.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the file set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over files.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    /// Get relative path from root.
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Relative path from root as a `/`-separated string, the key used
    /// throughout the index.
    pub fn relative_key(&self, path: &Path) -> String {
        let relative = self.relative_path(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::config(format!("invalid exclude pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("invalid exclude patterns: {e}")))
}

impl IntoIterator for FileSet {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
