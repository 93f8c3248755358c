//! Tree-sitter based Go parser.

pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tree_sitter::{Language as TsLanguage, Node, Parser as TsParser, Tree};

use crate::core::{Error, FileKind, Result, SourceFile};

/// Thread-safe pool of Go parsers.
///
/// Tree-sitter parsers are not `Sync`; each worker checks one out for the
/// duration of a parse and returns it afterwards.
pub struct Parser {
    idle: Mutex<Vec<TsParser>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Parse a file and return the syntax tree.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseResult> {
        let file = SourceFile::load(path)?;
        self.parse_source(&file)
    }

    /// Parse source content.
    pub fn parse_source(&self, file: &SourceFile) -> Result<ParseResult> {
        self.parse(&file.content, file.kind, &file.path)
    }

    /// Parse Go content.
    ///
    /// Files with syntax errors are rejected the same way the Go compiler
    /// would reject them.
    pub fn parse(&self, content: &[u8], kind: FileKind, path: &Path) -> Result<ParseResult> {
        let mut parser = self.checkout()?;
        let tree = parser.parse(content, None);
        self.idle.lock().push(parser);

        let tree = tree.ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            message: "Failed to parse file".to_string(),
        })?;

        if tree.root_node().has_error() {
            let line = first_error_line(tree.root_node()).unwrap_or(0);
            return Err(Error::Parse {
                path: path.to_path_buf(),
                message: format!("syntax error near line {line}"),
            });
        }

        Ok(ParseResult {
            tree: Arc::new(tree),
            source: content.to_vec(),
            kind,
            path: path.to_path_buf(),
        })
    }

    fn checkout(&self) -> Result<TsParser> {
        if let Some(parser) = self.idle.lock().pop() {
            return Ok(parser);
        }
        let mut parser = TsParser::new();
        parser
            .set_language(&go_language())
            .map_err(|e| Error::analysis(format!("incompatible Go grammar: {e}")))?;
        Ok(parser)
    }
}

/// Result of parsing a Go file.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed syntax tree.
    pub tree: Arc<Tree>,
    /// Original source content.
    pub source: Vec<u8>,
    /// Source or test file.
    pub kind: FileKind,
    /// File path.
    pub path: PathBuf,
}

impl ParseResult {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Tree-sitter language for Go.
pub fn go_language() -> TsLanguage {
    tree_sitter_go::LANGUAGE.into()
}

/// 1-indexed start line of a node.
pub fn start_line(node: &Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

fn first_error_line(node: Node<'_>) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(start_line(&node));
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error_line)
}
