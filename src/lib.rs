//! gotestgap - Test gap analysis for Go projects.
//!
//! Finds Go functions and methods that no test calls directly, tests that
//! live in a different `_test.go` file than the code they exercise, and
//! (optionally) functions whose statement coverage is below a threshold.
//!
//! # Example
//!
//! ```no_run
//! use gotestgap::analyzers::testgap::Analyzer as TestGapAnalyzer;
//! use gotestgap::config::Config;
//! use gotestgap::core::{AnalysisContext, Analyzer, FileSet};
//!
//! let config = Config::default();
//! let files = FileSet::from_path(".", &config).unwrap();
//! let ctx = AnalysisContext::new(&files, &config, None);
//! let analyzer = TestGapAnalyzer::new().with_coverage(false);
//! let result = analyzer.analyze(&ctx).unwrap();
//! println!("{} functions without tests", result.functions_without_tests.len());
//! ```

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod output;
pub mod parser;

pub use core::{AnalysisContext, Analyzer};
