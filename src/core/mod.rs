//! Core types and traits for Go test analysis.

mod analyzer;
mod error;
mod file_kind;
mod file_set;
mod progress;
mod source_file;

pub(crate) use analyzer::duration_serde;
pub use analyzer::{AnalysisContext, Analyzer, Summary};
pub use error::{Error, Result};
pub use file_kind::{is_skipped_dir, test_file_for, FileKind, TEST_FILE_SUFFIX};
pub use file_set::FileSet;
pub use progress::ProgressTracker;
pub use source_file::SourceFile;
