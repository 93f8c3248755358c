//! Test placement.
//!
//! Go convention pairs `foo.go` with `foo_test.go`. Each test routine is
//! attributed to a single primary source file, first by its name
//! (`TestParseHeader` exercises `parseHeader`), then by counting which file
//! declares most of what it calls. A routine is misplaced when the primary
//! file's test file is a different file in the same directory.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use super::calls::{method_part, KEY_SEPARATOR};
use super::index::{Declaration, ProjectIndex, TestRoutine, TEST_PREFIXES};
use crate::config::Config;
use crate::core::{test_file_for, AnalysisContext, Analyzer as AnalyzerTrait, Result, Summary};
use crate::parser::Parser;

/// A test routine that lives in the wrong `_test.go` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MisplacedTest {
    pub test: TestRoutine,
    pub actual_file: String,
    pub expected_file: String,
}

/// Call targets that some routine already tests from the matching test file.
///
/// Key `k` is correctly tested by routine `R` in `foo_test.go` when `R`
/// calls `k` and a declaration resolving `k` lives in `foo.go`.
#[derive(Debug, Clone, Default)]
pub struct CorrectlyTested {
    callers: HashMap<String, Vec<(String, u32)>>,
}

impl CorrectlyTested {
    pub fn build(index: &ProjectIndex) -> Self {
        let mut by_test_file: HashMap<String, Vec<&Declaration>> = HashMap::new();
        for decl in index.all_declarations() {
            by_test_file
                .entry(test_file_for(&decl.file))
                .or_default()
                .push(decl);
        }

        let mut callers: HashMap<String, Vec<(String, u32)>> = HashMap::new();
        for routine in index.all_tests() {
            let Some(paired) = by_test_file.get(&routine.file) else {
                continue;
            };
            for key in &routine.called_targets {
                if paired.iter().any(|decl| decl.resolves(key)) {
                    callers
                        .entry(key.clone())
                        .or_default()
                        .push((routine.file.clone(), routine.line));
                }
            }
        }

        Self { callers }
    }

    /// Whether a routine other than `routine` correctly tests `key`.
    pub fn by_other(&self, key: &str, routine: &TestRoutine) -> bool {
        self.callers.get(key).is_some_and(|callers| {
            callers
                .iter()
                .any(|(file, line)| *file != routine.file || *line != routine.line)
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.callers.contains_key(key)
    }
}

/// Name of the routine without its test prefix, split into candidate names.
///
/// `TestFoo` → `[Foo]`, `Test_Service_Start` → `[Service, Start]`.
pub fn naming_candidates(name: &str) -> Vec<&str> {
    let Some(rest) = TEST_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
    else {
        return Vec::new();
    };
    let rest = rest.strip_prefix(KEY_SEPARATOR).unwrap_or(rest);
    rest.split(KEY_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn key_matches_candidate(key: &str, candidate: &str) -> bool {
    let key = key.to_lowercase();
    key == candidate
        || key.ends_with(&format!("{KEY_SEPARATOR}{candidate}"))
        || key.starts_with(candidate)
        || method_part(&key).is_some_and(|method| method.starts_with(candidate))
}

/// Attribute a routine to a source file by its name.
pub fn find_source_by_test_name(routine: &TestRoutine, index: &ProjectIndex) -> Option<String> {
    let segments = naming_candidates(&routine.name);
    let hint = (segments.len() >= 2).then(|| segments[0]);

    for candidate in segments.iter().rev() {
        let candidate = candidate.to_lowercase();
        let resolved: Vec<&Declaration> = routine
            .called_targets
            .iter()
            .filter(|key| key_matches_candidate(key, &candidate))
            .flat_map(|key| index.all_declarations().filter(move |d| d.resolves(key)))
            .collect();

        if resolved.is_empty() {
            continue;
        }

        let hinted = hint.and_then(|hint| {
            resolved.iter().find(|decl| {
                decl.receiver
                    .as_deref()
                    .is_some_and(|receiver| receiver.eq_ignore_ascii_case(hint))
            })
        });
        return hinted.or(resolved.first()).map(|decl| decl.file.clone());
    }

    None
}

/// Attribute a routine to the file declaring most of its call targets.
///
/// Targets another routine already tests from the right place are left out,
/// so shared setup calls do not drag a routine toward their file. Ties go to
/// the lexicographically first file.
pub fn find_primary_by_call_count(
    routine: &TestRoutine,
    index: &ProjectIndex,
    correctly_tested: &CorrectlyTested,
) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for key in &routine.called_targets {
        if correctly_tested.by_other(key, routine) {
            continue;
        }
        for (file, decls) in &index.declarations {
            if decls.iter().any(|decl| decl.matches_call(key)) {
                *counts.entry(file.as_str()).or_default() += 1;
            }
        }
    }

    let mut primary: Option<(&str, usize)> = None;
    for (file, count) in counts {
        if primary.map_or(true, |(_, best)| count > best) {
            primary = Some((file, count));
        }
    }
    primary.map(|(file, _)| file.to_string())
}

/// Check one routine against its primary source file.
pub fn check_test_placement(
    routine: &TestRoutine,
    index: &ProjectIndex,
    correctly_tested: &CorrectlyTested,
) -> Option<MisplacedTest> {
    if routine.called_targets.is_empty() {
        return None;
    }

    let primary = find_source_by_test_name(routine, index)
        .or_else(|| find_primary_by_call_count(routine, index, correctly_tested))?;

    let expected_file = test_file_for(&primary);
    if expected_file == routine.file {
        return None;
    }
    if Path::new(&expected_file).parent() != Path::new(&routine.file).parent() {
        return None;
    }

    Some(MisplacedTest {
        test: routine.clone(),
        actual_file: routine.file.clone(),
        expected_file,
    })
}

/// Every misplaced routine, sorted by actual file then line.
pub fn find_misplaced_tests(index: &ProjectIndex) -> Vec<MisplacedTest> {
    let correctly_tested = CorrectlyTested::build(index);
    let routines: Vec<&TestRoutine> = index.all_tests().collect();

    let mut misplaced: Vec<MisplacedTest> = routines
        .par_iter()
        .filter_map(|routine| check_test_placement(routine, index, &correctly_tested))
        .collect();

    misplaced.sort_by(|a, b| {
        a.actual_file
            .cmp(&b.actual_file)
            .then(a.test.line.cmp(&b.test.line))
    });
    misplaced
}

/// Misplaced tests analyzer.
pub struct Analyzer {
    exclude_private: bool,
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
        }
    }

    pub fn with_exclude_private(mut self, exclude_private: bool) -> Self {
        self.exclude_private = exclude_private;
        self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "misplaced"
    }

    fn description(&self) -> &'static str {
        "Find tests that live in a different _test.go file than the code they exercise"
    }

    fn configure(&mut self, config: &Config) -> Result<()> {
        self.exclude_private = config.exclude_private;
        Ok(())
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let start = Instant::now();
        let parser = Parser::new();
        let index = ProjectIndex::build(ctx, &parser, self.exclude_private)?;
        let misplaced = find_misplaced_tests(&index);

        Ok(Analysis {
            summary: Summary::new(index.files_analyzed, misplaced.len(), start.elapsed()),
            misplaced_tests: misplaced,
        })
    }
}

/// Misplaced tests report.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub misplaced_tests: Vec<MisplacedTest>,
    pub summary: Summary,
}
