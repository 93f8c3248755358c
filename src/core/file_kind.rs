//! Go file classification.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extension of Go source files.
pub const GO_EXTENSION: &str = "go";

/// Suffix that marks a Go test file.
pub const TEST_FILE_SUFFIX: &str = "_test.go";

/// Directories never descended into.
pub const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// Role a Go file plays in its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular source file contributing declarations.
    Source,
    /// `_test.go` file contributing test routines.
    Test,
}

impl FileKind {
    /// Classify a path, returning `None` for non-Go files.
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension != GO_EXTENSION {
            return None;
        }
        let name = path.file_name()?.to_str()?;
        if name.ends_with(TEST_FILE_SUFFIX) {
            Some(Self::Test)
        } else {
            Some(Self::Source)
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Name of the test file that should hold tests for `source`.
///
/// `pkg/server.go` becomes `pkg/server_test.go`.
pub fn test_file_for(source: &str) -> String {
    let stem = source.strip_suffix(".go").unwrap_or(source);
    format!("{stem}{TEST_FILE_SUFFIX}")
}

/// Whether a directory name is excluded from the walk.
pub fn is_skipped_dir(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name) || name.starts_with('.')
}
