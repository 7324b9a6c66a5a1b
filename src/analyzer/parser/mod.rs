//! Java Source Parsing
//!
//! Tree-sitter based parsing of Java compilation units, with a TTL/capacity
//! bounded cache shared across parse workers. Parse failures are per-file and
//! never fatal: the file is dropped at debug level and the run continues.

pub mod cache;
pub mod java;

pub use cache::AstCache;
pub use java::{build_call_graph, extract_class_info, method_source};

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::constants::limits;
use crate::types::{JavelinError, Result};

/// A parsed compilation unit: the source text plus its tree-sitter tree
pub struct ParsedAst {
    source: String,
    tree: tree_sitter::Tree,
}

impl ParsedAst {
    /// Parse Java source text
    ///
    /// A tree whose root contains syntax errors is rejected: downstream
    /// extraction assumes a well-formed unit.
    pub fn parse(source: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| JavelinError::parse("<source>", format!("failed to load Java grammar: {e}")))?;

        let tree = parser
            .parse(source.as_str(), None)
            .ok_or_else(|| JavelinError::parse("<source>", "parser returned no tree"))?;

        if tree.root_node().has_error() {
            return Err(JavelinError::parse("<source>", "syntax error in compilation unit"));
        }

        Ok(Self { source, tree })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Source text spanned by a node; empty on a range mismatch
    pub fn text_of(&self, node: tree_sitter::Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_else(|e| {
            debug!(
                row = node.start_position().row + 1,
                error = %e,
                "UTF-8 extraction failed for node"
            );
            ""
        })
    }
}

/// Cached single-entrypoint Java parser
///
/// `parse_file` reads with lossy UTF-8 decoding, enforces the line cap, and
/// returns `None` for anything that cannot be parsed.
#[derive(Default)]
pub struct JavaParser {
    cache: AstCache,
}

impl JavaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one file, consulting and feeding the shared cache
    pub fn parse_file(&self, path: &Path) -> Option<Arc<ParsedAst>> {
        if let Some(ast) = self.cache.get(path) {
            return Some(ast);
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot read file");
                return None;
            }
        };
        let source = String::from_utf8_lossy(&bytes).into_owned();

        let line_count = source.lines().count();
        if line_count > limits::MAX_FILE_LINES {
            debug!(
                path = %path.display(),
                lines = line_count,
                "file exceeds the line cap, skipped"
            );
            return None;
        }

        match ParsedAst::parse(source) {
            Ok(ast) => {
                let ast = Arc::new(ast);
                self.cache.insert(path.to_path_buf(), Arc::clone(&ast));
                Some(ast)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "parse failed, file dropped");
                None
            }
        }
    }

    pub fn cache(&self) -> &AstCache {
        &self.cache
    }
}
