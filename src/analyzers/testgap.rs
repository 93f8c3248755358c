//! Full test-gap analysis.
//!
//! Builds the project index once and runs every check against it: untested
//! functions, misplaced tests, and (with a threshold) low-coverage
//! functions. A single coverage run feeds both the untested-function
//! suppression and the low-coverage listing.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::coverage::{self, LowCoverageFunc};
use super::index::{Declaration, ProjectIndex};
use super::placement::{self, MisplacedTest};
use super::untested::{self, TestedSet};
use crate::config::Config;
use crate::core::{duration_serde, AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::parser::Parser;

/// Test-gap analyzer.
pub struct Analyzer {
    exclude_private: bool,
    use_coverage: bool,
    threshold: f64,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            exclude_private: false,
            use_coverage: true,
            threshold: 0.0,
        }
    }

    pub fn with_exclude_private(mut self, exclude_private: bool) -> Self {
        self.exclude_private = exclude_private;
        self
    }

    pub fn with_coverage(mut self, use_coverage: bool) -> Self {
        self.use_coverage = use_coverage;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Run every check against an already built index.
    pub fn analyze_index(
        &self,
        index: &ProjectIndex,
        coverage: Option<&coverage::CoverageReport>,
    ) -> (Vec<Declaration>, Vec<MisplacedTest>, Vec<LowCoverageFunc>) {
        let tested = TestedSet::from_tests(index.all_tests());
        let coverage_map = coverage
            .filter(|_| self.use_coverage)
            .map(|report| report.to_map());

        let functions =
            untested::find_functions_without_tests(index, &tested, coverage_map.as_ref());
        let misplaced = placement::find_misplaced_tests(index);
        let low = coverage
            .map(|report| report.low_coverage(self.threshold))
            .unwrap_or_default();

        (functions, misplaced, low)
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "testgap"
    }

    fn description(&self) -> &'static str {
        "Find untested functions, misplaced tests and low-coverage functions"
    }

    fn requires_toolchain(&self) -> bool {
        self.use_coverage || self.threshold > 0.0
    }

    fn configure(&mut self, config: &Config) -> Result<()> {
        self.exclude_private = config.exclude_private;
        self.use_coverage = config.coverage.enabled;
        self.threshold = config.coverage.threshold;
        Ok(())
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let start = Instant::now();

        let coverage = if self.requires_toolchain() {
            coverage::collect_or_warn(ctx.root)
        } else {
            None
        };

        let parser = Parser::new();
        let index = ProjectIndex::build(ctx, &parser, self.exclude_private)?;
        let (functions, misplaced, low) = self.analyze_index(&index, coverage.as_ref());

        let summary = AnalysisSummary {
            files_analyzed: index.files_analyzed,
            files_skipped: index.files_skipped,
            declarations: index.declaration_count(),
            test_routines: index.test_count(),
            untested: functions.len(),
            misplaced: misplaced.len(),
            low_coverage: low.len(),
            coverage_used: coverage.is_some(),
            duration: start.elapsed(),
        };

        tracing::info!(
            "Analysis complete: {} untested, {} misplaced, {} low coverage",
            summary.untested,
            summary.misplaced,
            summary.low_coverage
        );

        Ok(Analysis {
            root: ctx.root.display().to_string(),
            functions_without_tests: functions,
            misplaced_tests: misplaced,
            low_coverage_funcs: low,
            threshold: self.threshold,
            summary,
        })
    }
}

/// Full test-gap report.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub root: String,
    pub functions_without_tests: Vec<Declaration>,
    pub misplaced_tests: Vec<MisplacedTest>,
    pub low_coverage_funcs: Vec<LowCoverageFunc>,
    pub threshold: f64,
    pub summary: AnalysisSummary,
}

/// Counts for a full analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSummary {
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub declarations: usize,
    pub test_routines: usize,
    pub untested: usize,
    pub misplaced: usize,
    pub low_coverage: usize,
    pub coverage_used: bool,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}
