//! Declaration indexer and test extractor.
//!
//! Every Go file is reduced to a [`FileIndex`]: the functions and methods it
//! declares (source files) or the test routines it contains together with
//! the targets their bodies call (`_test.go` files). Files are indexed
//! independently and merged into a [`ProjectIndex`] keyed by relative path.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::calls;
use crate::core::{AnalysisContext, FileKind, Result};
use crate::parser::queries::{
    is_function_declaration, CALL_EXPRESSION, FIELD_BODY, FIELD_NAME, FIELD_RECEIVER, FIELD_TYPE,
    GENERIC_TYPE, IDENTIFIER, PARAMETER_DECLARATION, PARENTHESIZED_TYPE, POINTER_TYPE,
    TYPE_IDENTIFIER,
};
use crate::parser::{self, ParseResult, Parser};

/// Name prefixes recognized as test routines inside `_test.go` files.
pub const TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example", "Fuzz"];

/// Language entry points that are never reported.
pub const ENTRY_POINTS: &[&str] = &["main", "init"];

/// A function or method declared in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub file: String,
    pub line: u32,
    /// Base type name of the receiver, `None` for free functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            receiver: None,
        }
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Exported per Go's capitalization rule.
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// `Receiver_Name` for methods.
    pub fn qualified_key(&self) -> Option<String> {
        self.receiver
            .as_deref()
            .map(|receiver| calls::qualified_key(receiver, &self.name))
    }

    /// Whether a call target names this declaration exactly, either by plain
    /// name or by `Receiver_Name`.
    pub fn matches_call(&self, key: &str) -> bool {
        self.name == key || self.qualified_key().is_some_and(|q| q == key)
    }

    /// Looser match that also accepts `anyIdent_Name`, used when the
    /// call-site identifier differs from the declared receiver type.
    pub fn resolves(&self, key: &str) -> bool {
        self.matches_call(key) || calls::method_part(key).is_some_and(|m| m == self.name)
    }

    /// `(Receiver).Name` or `Name`.
    pub fn display_name(&self) -> String {
        match &self.receiver {
            Some(receiver) => format!("({receiver}).{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A `Test*`/`Benchmark*`/`Example*`/`Fuzz*` routine and what it calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRoutine {
    pub name: String,
    pub file: String,
    pub line: u32,
    /// Distinct call targets in first-seen order.
    #[serde(default)]
    pub called_targets: Vec<String>,
}

impl TestRoutine {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            called_targets: Vec::new(),
        }
    }

    pub fn with_calls<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        for target in targets {
            let target = target.into();
            if seen.insert(target.clone()) {
                self.called_targets.push(target);
            }
        }
        self
    }

    /// Same routine (file and line identify it).
    pub fn is_same(&self, other: &TestRoutine) -> bool {
        self.file == other.file && self.line == other.line
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    pub path: String,
    pub declarations: Vec<Declaration>,
    pub tests: Vec<TestRoutine>,
}

/// Declarations and test routines for a whole tree, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    pub declarations: BTreeMap<String, Vec<Declaration>>,
    pub tests: BTreeMap<String, Vec<TestRoutine>>,
    /// Files that parsed and contributed to the index.
    pub files_analyzed: usize,
    /// Files skipped because they failed to load or parse.
    pub files_skipped: usize,
}

impl ProjectIndex {
    /// Parse and index every file in the context, in parallel.
    pub fn build(
        ctx: &AnalysisContext<'_>,
        parser: &Parser,
        exclude_private: bool,
    ) -> Result<Self> {
        let files: Vec<&PathBuf> = ctx.files.iter().collect();
        let total = files.len();
        let done = std::sync::atomic::AtomicUsize::new(0);

        let results: Vec<Option<FileIndex>> = files
            .par_iter()
            .map(|path| {
                let key = ctx.files.relative_key(path);
                let indexed = match parser.parse_file(path) {
                    Ok(result) => Some(index_file(&result, &key, exclude_private)),
                    Err(e) => {
                        tracing::debug!("Skipping {}: {}", key, e);
                        None
                    }
                };
                let current = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                ctx.report_progress(current, total);
                indexed
            })
            .collect();

        let skipped = results.iter().filter(|r| r.is_none()).count();
        let mut index = Self::from_files(results.into_iter().flatten());
        index.files_skipped = skipped;

        tracing::debug!(
            "Indexed {} files ({} skipped): {} declarations, {} test routines",
            index.files_analyzed,
            index.files_skipped,
            index.declaration_count(),
            index.test_count()
        );

        Ok(index)
    }

    /// Merge per-file results. Keys are file paths, so merging never
    /// conflicts and the result does not depend on input order.
    pub fn from_files(files: impl IntoIterator<Item = FileIndex>) -> Self {
        let mut index = Self::default();
        for file in files {
            index.files_analyzed += 1;
            if !file.declarations.is_empty() {
                index
                    .declarations
                    .entry(file.path.clone())
                    .or_default()
                    .extend(file.declarations);
            }
            if !file.tests.is_empty() {
                index.tests.entry(file.path).or_default().extend(file.tests);
            }
        }
        index
    }

    /// All declarations, ordered by file then position.
    pub fn all_declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.values().flatten()
    }

    /// All test routines, ordered by file then position.
    pub fn all_tests(&self) -> impl Iterator<Item = &TestRoutine> {
        self.tests.values().flatten()
    }

    pub fn declaration_count(&self) -> usize {
        self.declarations.values().map(Vec::len).sum()
    }

    pub fn test_count(&self) -> usize {
        self.tests.values().map(Vec::len).sum()
    }
}

/// Index a parsed file according to its kind.
pub fn index_file(result: &ParseResult, path: &str, exclude_private: bool) -> FileIndex {
    let mut file = FileIndex {
        path: path.to_string(),
        ..FileIndex::default()
    };
    match result.kind {
        FileKind::Source => file.declarations = index_declarations(result, path, exclude_private),
        FileKind::Test => file.tests = extract_tests(result, path),
    }
    file
}

/// Extract eligible top-level function and method declarations.
pub fn index_declarations(
    result: &ParseResult,
    path: &str,
    exclude_private: bool,
) -> Vec<Declaration> {
    let root = result.root_node();
    let mut cursor = root.walk();
    let mut declarations = Vec::new();

    for node in root.children(&mut cursor) {
        if !is_function_declaration(node.kind()) {
            continue;
        }
        let Some(name) = declared_name(&node, &result.source) else {
            continue;
        };
        if ENTRY_POINTS.contains(&name) {
            continue;
        }
        if exclude_private && !is_exported(name) {
            continue;
        }

        let mut declaration = Declaration::new(name, path, parser::start_line(&node));
        if let Some(receiver) = receiver_type(&node, &result.source) {
            declaration = declaration.with_receiver(receiver);
        }
        declarations.push(declaration);
    }

    declarations
}

/// Extract test routines and the targets their bodies call.
pub fn extract_tests(result: &ParseResult, path: &str) -> Vec<TestRoutine> {
    let root = result.root_node();
    let mut cursor = root.walk();
    let mut tests = Vec::new();

    for node in root.children(&mut cursor) {
        if !is_function_declaration(node.kind()) {
            continue;
        }
        let Some(name) = declared_name(&node, &result.source) else {
            continue;
        };
        if !is_test_function(name) {
            continue;
        }

        let mut routine = TestRoutine::new(name, path, parser::start_line(&node));
        if let Some(body) = node.child_by_field_name(FIELD_BODY) {
            routine.called_targets = collect_call_targets(body, &result.source);
        }
        tests.push(routine);
    }

    tests
}

/// Whether a name carries one of the test routine prefixes.
pub fn is_test_function(name: &str) -> bool {
    TEST_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Go exports identifiers whose first character is uppercase.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn declared_name<'s>(node: &Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name(FIELD_NAME)?
        .utf8_text(source)
        .ok()
        .filter(|name| !name.is_empty())
}

/// Base type name of a method receiver.
///
/// `(s *Stack[T])`, `(s Stack[T])`, `(s *Stack)` and `(Stack)` all yield
/// `Stack`.
pub fn receiver_type(node: &Node<'_>, source: &[u8]) -> Option<String> {
    let receiver = node.child_by_field_name(FIELD_RECEIVER)?;
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|child| child.kind() == PARAMETER_DECLARATION)?;
    let type_node = param.child_by_field_name(FIELD_TYPE)?;
    base_type_name(&type_node, source)
}

fn base_type_name(node: &Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        TYPE_IDENTIFIER | IDENTIFIER => node.utf8_text(source).ok().map(str::to_string),
        POINTER_TYPE | PARENTHESIZED_TYPE => {
            let inner = node.named_child(0)?;
            base_type_name(&inner, source)
        }
        GENERIC_TYPE => {
            let inner = node
                .child_by_field_name(FIELD_TYPE)
                .or_else(|| node.named_child(0))?;
            base_type_name(&inner, source)
        }
        _ => None,
    }
}

/// Walk a body in pre-order and collect distinct call targets in the order
/// they are first seen. Nested function literals are part of the body.
fn collect_call_targets(body: Node<'_>, source: &[u8]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut cursor = body.walk();

    loop {
        let node = cursor.node();
        if node.kind() == CALL_EXPRESSION {
            if let Some(key) = calls::target_key(&node, source) {
                if seen.insert(key.clone()) {
                    targets.push(key);
                }
            }
        }

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.depth() == 0 {
                return targets;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return targets;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(path: &str, code: &str) -> ParseResult {
        let kind = FileKind::detect(Path::new(path)).unwrap();
        Parser::new()
            .parse(code.as_bytes(), kind, Path::new(path))
            .unwrap()
    }

    #[test]
    fn test_is_test_function() {
        let cases = [
            ("TestFoo", true),
            ("BenchmarkFoo", true),
            ("ExampleFoo", true),
            ("FuzzFoo", true),
            ("Test", true),
            ("testFoo", false),
            ("helperFunc", false),
            ("NotATest", false),
        ];
        for (name, expected) in cases {
            assert_eq!(is_test_function(name), expected, "is_test_function({name:?})");
        }
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("PublicFunc"));
        assert!(!is_exported("privateFunc"));
        assert!(!is_exported("_hidden"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_index_declarations() {
        let result = parse(
            "lib.go",
            r#"package lib

func Foo() {}
func init() {}
func main() {}
type Bar struct{}
func (b *Bar) Method() {}
func helper() {}
"#,
        );

        let decls = index_declarations(&result, "lib.go", false);
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Foo", "Method", "helper"]);
        assert_eq!(decls[0].line, 3);
        assert_eq!(decls[0].receiver, None);
        assert_eq!(decls[1].receiver.as_deref(), Some("Bar"));
        assert_eq!(decls[1].file, "lib.go");
    }

    #[test]
    fn test_index_declarations_exclude_private() {
        let result = parse(
            "lib.go",
            "package lib\n\nfunc Foo() {}\nfunc helper() {}\nfunc (b Bar) hidden() {}\n",
        );
        let decls = index_declarations(&result, "lib.go", true);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "Foo");
    }

    #[test]
    fn test_receiver_types() {
        let result = parse(
            "types.go",
            r#"package types

func (s *Stack[T]) Push(v T) {}
func (s Stack[T]) Len() int { return 0 }
func (m *Map[K, V]) Get(k K) V { var v V; return v }
func (c Counter) Inc() {}
func (*Server) Close() {}
func (Server) Name() string { return "" }
"#,
        );
        let decls = index_declarations(&result, "types.go", false);
        let receivers: Vec<(&str, Option<&str>)> = decls
            .iter()
            .map(|d| (d.name.as_str(), d.receiver.as_deref()))
            .collect();
        assert_eq!(
            receivers,
            vec![
                ("Push", Some("Stack")),
                ("Len", Some("Stack")),
                ("Get", Some("Map")),
                ("Inc", Some("Counter")),
                ("Close", Some("Server")),
                ("Name", Some("Server")),
            ]
        );
    }

    #[test]
    fn test_extract_tests() {
        let result = parse(
            "foo_test.go",
            r#"package foo

import "testing"

func TestFoo(t *testing.T) {
	Foo()
	Bar()
	Foo()
}

func TestMethod(t *testing.T) {
	obj := &MyType{}
	obj.Method()
	pkg.Function()
}

func TestMixed(t *testing.T) {
	localFunc()
	obj.Method()
	a.b.Chained()
	t.Run("sub", func(t *testing.T) {
		Nested()
	})
}

func TestEmpty(t *testing.T) {}

func helperInTest() { Foo() }
"#,
        );

        let tests = extract_tests(&result, "foo_test.go");
        let names: Vec<&str> = tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["TestFoo", "TestMethod", "TestMixed", "TestEmpty"]);

        assert_eq!(tests[0].called_targets, vec!["Foo", "Bar"]);
        assert_eq!(tests[1].called_targets, vec!["obj_Method", "pkg_Function"]);
        assert_eq!(
            tests[2].called_targets,
            vec!["localFunc", "obj_Method", "Chained", "t_Run", "Nested"]
        );
        assert!(tests[3].called_targets.is_empty());
        assert_eq!(tests[0].line, 5);
    }

    #[test]
    fn test_source_file_has_no_tests() {
        let result = parse("foo.go", "package foo\n\nfunc TestLooking() { Foo() }\n");
        let file = index_file(&result, "foo.go", false);
        assert!(file.tests.is_empty());
        assert_eq!(file.declarations.len(), 1);
    }

    #[test]
    fn test_test_file_has_no_declarations() {
        let result = parse("foo_test.go", "package foo\n\nfunc helper() {}\n");
        let file = index_file(&result, "foo_test.go", false);
        assert!(file.declarations.is_empty());
        assert!(file.tests.is_empty());
    }

    #[test]
    fn test_declaration_matching() {
        let method = Declaration::new("Start", "svc.go", 10).with_receiver("Service");
        assert!(method.matches_call("Start"));
        assert!(method.matches_call("Service_Start"));
        assert!(!method.matches_call("svc_Start"));
        assert!(method.resolves("svc_Start"));
        assert!(!method.resolves("svc_Stop"));
        assert_eq!(method.display_name(), "(Service).Start");

        let func = Declaration::new("Foo", "foo.go", 1);
        assert!(func.matches_call("Foo"));
        assert!(!func.matches_call("Bar"));
        assert_eq!(func.qualified_key(), None);
        assert_eq!(func.display_name(), "Foo");
    }

    #[test]
    fn test_routine_with_calls_dedups() {
        let routine = TestRoutine::new("TestA", "a_test.go", 1).with_calls(["A", "B", "A"]);
        assert_eq!(routine.called_targets, vec!["A", "B"]);
    }

    #[test]
    fn test_from_files_merges_by_path() {
        let a = FileIndex {
            path: "a.go".to_string(),
            declarations: vec![Declaration::new("FuncA", "a.go", 3)],
            tests: Vec::new(),
        };
        let b_test = FileIndex {
            path: "b_test.go".to_string(),
            declarations: Vec::new(),
            tests: vec![TestRoutine::new("TestB", "b_test.go", 5)],
        };
        let empty = FileIndex {
            path: "doc.go".to_string(),
            ..FileIndex::default()
        };

        let index = ProjectIndex::from_files(vec![b_test, empty, a]);
        assert_eq!(index.files_analyzed, 3);
        assert_eq!(index.declaration_count(), 1);
        assert_eq!(index.test_count(), 1);
        assert!(index.declarations.contains_key("a.go"));
        assert!(!index.declarations.contains_key("doc.go"));
    }

    #[test]
    fn test_build_skips_unparseable_files() {
        use crate::config::Config;
        use crate::core::FileSet;

        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("good.go"), "package p\n\nfunc Good() {}\n").unwrap();
        std::fs::write(temp.path().join("bad.go"), "package p\n\nfunc Broken( {\n").unwrap();

        let config = Config::default();
        let files = FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, None);
        let index = ProjectIndex::build(&ctx, &Parser::new(), false).unwrap();

        assert_eq!(index.files_analyzed, 1);
        assert_eq!(index.files_skipped, 1);
        assert_eq!(index.declaration_count(), 1);
    }
}
