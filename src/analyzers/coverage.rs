//! Statement coverage from the Go toolchain.
//!
//! Runs `go test -coverprofile` followed by `go tool cover -func` once per
//! run. The parsed report feeds both the untested-function suppression map
//! and the low-coverage listing.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::index::ENTRY_POINTS;
use crate::config::Config;
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, Result, Summary};

/// `path/to/file.go:20:<ws>funcName<ws>85.7%`
static COVER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+):(\d+):\s+(\S+)\s+(\d+\.?\d*)%$").expect("valid regex")
});

/// One function line of `go tool cover -func` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageEntry {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub coverage: f64,
}

/// A function whose coverage is below the requested threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowCoverageFunc {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub coverage: f64,
    pub threshold: f64,
}

/// The Go module enclosing the analyzed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Import path from the `module` directive.
    pub path: String,
    /// Directory holding `go.mod`.
    pub dir: PathBuf,
}

/// Find `go.mod` in `root` or its ancestors.
pub fn find_module(root: &Path) -> Result<GoModule> {
    for dir in root.ancestors() {
        let go_mod = dir.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&go_mod)?;
        let path = parse_module_path(&content).ok_or_else(|| {
            Error::coverage(format!("no module directive in {}", go_mod.display()))
        })?;
        return Ok(GoModule {
            path,
            dir: dir.to_path_buf(),
        });
    }
    Err(Error::coverage(format!(
        "no go.mod found in {} or its parents",
        root.display()
    )))
}

/// Extract the import path from a `module` directive.
pub fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.split("//").next().unwrap_or("").trim();
        let path = rest.trim_matches('"').trim_matches('`');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Parsed coverage for every function the toolchain measured.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub entries: Vec<CoverageEntry>,
}

impl CoverageReport {
    /// Run the Go toolchain in `root` and parse its per-function coverage.
    pub fn collect(root: &Path) -> Result<Self> {
        let module = find_module(root)?;

        let profile = tempfile::Builder::new()
            .prefix("coverage-")
            .suffix(".out")
            .tempfile()?;
        let profile_arg = profile.path().display().to_string();

        tracing::debug!("Running: go test -coverprofile={} ./...", profile_arg);
        run_go(root, &["test", &format!("-coverprofile={profile_arg}"), "./..."])?;

        tracing::debug!("Running: go tool cover -func={}", profile_arg);
        let stdout = run_go(root, &["tool", "cover", &format!("-func={profile_arg}")])?;

        let report = Self::parse(&stdout, root, Some(&module));
        tracing::debug!("Coverage measured for {} functions", report.entries.len());
        Ok(report)
    }

    /// Parse `go tool cover -func` output. Unrecognized lines and the
    /// `total:` line are ignored.
    pub fn parse(output: &str, root: &Path, module: Option<&GoModule>) -> Self {
        let entries = output
            .lines()
            .filter(|line| !line.starts_with("total:"))
            .filter_map(|line| {
                let caps = COVER_LINE.captures(line.trim_end())?;
                let line_no = caps[2].parse().ok()?;
                let coverage = caps[4].parse().ok()?;
                Some(CoverageEntry {
                    file: normalize_path(&caps[1], root, module),
                    line: line_no,
                    name: caps[3].to_string(),
                    coverage,
                })
            })
            .collect();
        Self { entries }
    }

    /// Highest percentage per plain function name.
    pub fn to_map(&self) -> CoverageMap {
        let mut map = CoverageMap::default();
        for entry in &self.entries {
            map.insert(&entry.name, entry.coverage);
        }
        map
    }

    /// Functions strictly below `threshold`, sorted by file then line.
    /// A threshold of zero disables the listing.
    pub fn low_coverage(&self, threshold: f64) -> Vec<LowCoverageFunc> {
        if threshold <= 0.0 {
            return Vec::new();
        }
        let mut low: Vec<LowCoverageFunc> = self
            .entries
            .iter()
            .filter(|entry| entry.coverage < threshold)
            .filter(|entry| !ENTRY_POINTS.contains(&entry.name.as_str()))
            .map(|entry| LowCoverageFunc {
                file: entry.file.clone(),
                line: entry.line,
                name: entry.name.clone(),
                coverage: entry.coverage,
                threshold,
            })
            .collect();
        low.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
        low
    }
}

/// Function name to statement coverage percentage.
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    percentages: HashMap<String, f64>,
}

impl CoverageMap {
    /// Record a percentage, keeping the highest seen for the name.
    pub fn insert(&mut self, name: &str, coverage: f64) {
        let slot = self.percentages.entry(name.to_string()).or_insert(coverage);
        if coverage > *slot {
            *slot = coverage;
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.percentages.get(name).copied()
    }

    pub fn is_adequate(&self, name: &str, threshold: f64) -> bool {
        self.get(name).is_some_and(|pct| pct >= threshold)
    }
}

/// Collect coverage, downgrading any failure to a warning.
pub fn collect_or_warn(root: &Path) -> Option<CoverageReport> {
    match CoverageReport::collect(root) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!("Coverage analysis failed, continuing without it: {}", e);
            None
        }
    }
}

/// Map a path printed by `go tool cover` to a path relative to `root`.
///
/// Module import paths are resolved through `go.mod`; absolute paths under
/// the root are stripped. Anything else is returned unchanged.
pub fn normalize_path(raw: &str, root: &Path, module: Option<&GoModule>) -> String {
    if let Some(module) = module {
        let rest = raw
            .strip_prefix(module.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'));
        if let Some(rest) = rest {
            if let Ok(relative) = module.dir.join(rest).strip_prefix(root) {
                return slash_path(relative);
            }
        }
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        if let Ok(relative) = path.strip_prefix(root) {
            return slash_path(relative);
        }
    }

    raw.to_string()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn run_go(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("go")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::coverage(format!("failed to run go {}: {e}", args[0])))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::coverage(format!(
            "go {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Low-coverage analyzer.
pub struct Analyzer {
    threshold: f64,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self { threshold: 0.0 }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "coverage"
    }

    fn description(&self) -> &'static str {
        "List functions whose statement coverage is below a threshold"
    }

    fn requires_toolchain(&self) -> bool {
        true
    }

    fn configure(&mut self, config: &Config) -> Result<()> {
        self.threshold = config.coverage.threshold;
        Ok(())
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        if self.threshold <= 0.0 {
            return Err(Error::InvalidArgument(
                "coverage requires a threshold above 0 (use --threshold)".to_string(),
            ));
        }

        let start = Instant::now();
        let report = CoverageReport::collect(ctx.root)?;
        let low = report.low_coverage(self.threshold);
        let measured_files = {
            let mut files: Vec<&str> = report.entries.iter().map(|e| e.file.as_str()).collect();
            files.sort_unstable();
            files.dedup();
            files.len()
        };

        Ok(Analysis {
            threshold: self.threshold,
            functions_measured: report.entries.len(),
            summary: Summary::new(measured_files, low.len(), start.elapsed()),
            low_coverage_funcs: low,
        })
    }
}

/// Low-coverage report.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub threshold: f64,
    pub functions_measured: usize,
    pub low_coverage_funcs: Vec<LowCoverageFunc>,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;

    const COVER_OUTPUT: &str = "\
example.com/shop/cart.go:12:\t\tAdd\t\t\t100.0%
example.com/shop/cart.go:30:\t\tRemove\t\t\t25.0%
example.com/shop/internal/tax/tax.go:8:\tRate\t\t\t0.0%
example.com/shop/main.go:5:\t\tmain\t\t\t0.0%
example.com/shop/main.go:9:\t\tinit\t\t\t0.0%
example.com/shop/store.go:4:\t\tAdd\t\t\t40.0%
not a coverage line
total:\t\t\t\t\t(statements)\t\t52.3%
";

    fn module(dir: &Path) -> GoModule {
        GoModule {
            path: "example.com/shop".to_string(),
            dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_parse_cover_output() {
        let root = Path::new("/work/shop");
        let report = CoverageReport::parse(COVER_OUTPUT, root, Some(&module(root)));

        assert_eq!(report.entries.len(), 6);
        assert_eq!(
            report.entries[0],
            CoverageEntry {
                file: "cart.go".to_string(),
                line: 12,
                name: "Add".to_string(),
                coverage: 100.0,
            }
        );
        assert_eq!(report.entries[2].file, "internal/tax/tax.go");
    }

    #[test]
    fn test_parse_relative_to_subdirectory() {
        let module_dir = Path::new("/work/shop");
        let root = Path::new("/work/shop/internal");
        let report = CoverageReport::parse(COVER_OUTPUT, root, Some(&module(module_dir)));
        // Files outside the analyzed root keep their import path.
        assert_eq!(report.entries[0].file, "example.com/shop/cart.go");
        assert_eq!(report.entries[2].file, "tax/tax.go");
    }

    #[test]
    fn test_normalize_absolute_path() {
        let root = Path::new("/work/shop");
        assert_eq!(normalize_path("/work/shop/pkg/a.go", root, None), "pkg/a.go");
        assert_eq!(normalize_path("/elsewhere/a.go", root, None), "/elsewhere/a.go");
        assert_eq!(normalize_path("pkg/a.go", root, None), "pkg/a.go");
    }

    #[test]
    fn test_coverage_map_keeps_highest() {
        let root = Path::new("/work/shop");
        let map = CoverageReport::parse(COVER_OUTPUT, root, Some(&module(root))).to_map();
        assert_eq!(map.get("Add"), Some(100.0));
        assert_eq!(map.get("Remove"), Some(25.0));
        assert_eq!(map.get("Missing"), None);
        assert!(map.is_adequate("Add", 50.0));
        assert!(!map.is_adequate("Remove", 50.0));
    }

    #[test]
    fn test_low_coverage() {
        let root = Path::new("/work/shop");
        let report = CoverageReport::parse(COVER_OUTPUT, root, Some(&module(root)));
        let low = report.low_coverage(50.0);

        let found: Vec<(&str, &str)> = low
            .iter()
            .map(|f| (f.file.as_str(), f.name.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("cart.go", "Remove"),
                ("internal/tax/tax.go", "Rate"),
                ("store.go", "Add"),
            ]
        );
        assert!(low.iter().all(|f| f.threshold == 50.0));
    }

    #[test]
    fn test_low_coverage_is_strictly_below() {
        let report = CoverageReport {
            entries: vec![CoverageEntry {
                file: "a.go".to_string(),
                line: 1,
                name: "Exact".to_string(),
                coverage: 40.0,
            }],
        };
        assert!(report.low_coverage(40.0).is_empty());
        assert_eq!(report.low_coverage(40.1).len(), 1);
        assert!(report.low_coverage(0.0).is_empty());
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(
            parse_module_path("module example.com/shop\n\ngo 1.22\n"),
            Some("example.com/shop".to_string())
        );
        assert_eq!(
            parse_module_path("// comment\nmodule \"example.com/quoted\" // trailing\n"),
            Some("example.com/quoted".to_string())
        );
        assert_eq!(parse_module_path("modules x\n"), None);
        assert_eq!(parse_module_path("go 1.22\n"), None);
    }

    #[test]
    fn test_find_module_in_ancestor() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("go.mod"), "module example.com/app\n").unwrap();
        let nested = temp.path().join("pkg").join("util");
        std::fs::create_dir_all(&nested).unwrap();

        let module = find_module(&nested).unwrap();
        assert_eq!(module.path, "example.com/app");
        assert_eq!(module.dir, temp.path());
    }

    #[test]
    fn test_find_module_missing() {
        let temp = tempfile::tempdir().unwrap();
        // Only fails when no ancestor of the temp dir has a go.mod either.
        if temp.path().ancestors().any(|d| d.join("go.mod").is_file()) {
            return;
        }
        assert!(matches!(find_module(temp.path()), Err(Error::Coverage(_))));
    }

    #[test]
    fn test_collect_or_warn_without_module() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("lib.go"), "package lib\n").unwrap();
        if temp.path().ancestors().any(|d| d.join("go.mod").is_file()) {
            return;
        }
        assert!(collect_or_warn(temp.path()).is_none());
        assert!(matches!(
            CoverageReport::collect(temp.path()),
            Err(Error::Coverage(_))
        ));
    }

    #[test]
    fn test_analyzer_requires_threshold() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::default();
        let files = crate::core::FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, None);

        let result = Analyzer::new().analyze(&ctx);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
