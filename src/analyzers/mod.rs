//! Test-gap analyzers for Go projects.

pub mod calls;
pub mod coverage;
pub mod index;
pub mod placement;
pub mod testgap;
pub mod untested;

// Re-export analyzer types for convenience
pub use coverage::Analyzer as CoverageAnalyzer;
pub use placement::Analyzer as MisplacedAnalyzer;
pub use testgap::Analyzer as TestGapAnalyzer;
pub use untested::Analyzer as UntestedAnalyzer;
