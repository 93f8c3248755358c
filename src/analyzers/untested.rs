//! Untested-function detection.
//!
//! A declaration counts as tested when a test routine calls it by plain
//! name, by `Receiver_Name`, or through any `ident_Name` selector, or when
//! the coverage tool reports it at or above [`COVERAGE_ADEQUACY_THRESHOLD`].

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;

use super::calls::KEY_SEPARATOR;
use super::coverage::{self, CoverageMap};
use super::index::{Declaration, ProjectIndex, TestRoutine};
use crate::config::Config;
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result, Summary};
use crate::parser::Parser;

/// Statement coverage at which a function is considered exercised
/// indirectly.
pub const COVERAGE_ADEQUACY_THRESHOLD: f64 = 50.0;

/// Union of every call target across all test routines.
#[derive(Debug, Clone, Default)]
pub struct TestedSet {
    keys: HashSet<String>,
    /// Every tail following a separator, so `a_b_Start` yields `b_Start`
    /// and `Start`.
    suffixes: HashSet<String>,
}

impl TestedSet {
    pub fn from_tests<'a>(tests: impl IntoIterator<Item = &'a TestRoutine>) -> Self {
        let mut set = Self::default();
        for routine in tests {
            for key in &routine.called_targets {
                set.insert(key);
            }
        }
        set
    }

    pub fn insert(&mut self, key: &str) {
        if !self.keys.insert(key.to_string()) {
            return;
        }
        for (i, c) in key.char_indices() {
            if c == KEY_SEPARATOR {
                let tail = &key[i + c.len_utf8()..];
                if !tail.is_empty() {
                    self.suffixes.insert(tail.to_string());
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Some tested key ends in `_name`.
    pub fn has_suffix(&self, name: &str) -> bool {
        self.suffixes.contains(name)
    }

    /// Whether any test routine reaches the declaration.
    pub fn covers(&self, decl: &Declaration) -> bool {
        self.contains(&decl.name)
            || decl.qualified_key().is_some_and(|q| self.contains(&q))
            || self.has_suffix(&decl.name)
    }
}

/// Declarations no test reaches, sorted by file then line.
pub fn find_functions_without_tests(
    index: &ProjectIndex,
    tested: &TestedSet,
    coverage: Option<&CoverageMap>,
) -> Vec<Declaration> {
    let mut untested: Vec<Declaration> = index
        .all_declarations()
        .filter(|decl| !tested.covers(decl))
        .filter(|decl| {
            !coverage.is_some_and(|map| map.is_adequate(&decl.name, COVERAGE_ADEQUACY_THRESHOLD))
        })
        .cloned()
        .collect();

    untested.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    untested
}

/// Untested functions analyzer.
pub struct Analyzer {
    exclude_private: bool,
    use_coverage: bool,
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
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "untested"
    }

    fn description(&self) -> &'static str {
        "Find functions and methods that no test routine calls"
    }

    fn requires_toolchain(&self) -> bool {
        self.use_coverage
    }

    fn configure(&mut self, config: &Config) -> Result<()> {
        self.exclude_private = config.exclude_private;
        self.use_coverage = config.coverage.enabled;
        Ok(())
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let start = Instant::now();

        let coverage_map = if self.use_coverage {
            coverage::collect_or_warn(ctx.root).map(|report| report.to_map())
        } else {
            None
        };

        let parser = Parser::new();
        let index = ProjectIndex::build(ctx, &parser, self.exclude_private)?;
        let tested = TestedSet::from_tests(index.all_tests());
        let functions = find_functions_without_tests(&index, &tested, coverage_map.as_ref());

        Ok(Analysis {
            summary: Summary::new(index.files_analyzed, functions.len(), start.elapsed()),
            functions_without_tests: functions,
        })
    }
}

/// Untested functions report.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub functions_without_tests: Vec<Declaration>,
    pub summary: Summary,
}
