//! Project Analysis Frontend
//!
//! File discovery and Java parsing: the walker that admits files per phase
//! and the tree-sitter parser feeding the class index and call graph.

pub mod parser;
pub mod scanner;

pub use parser::{AstCache, JavaParser, ParsedAst};
pub use scanner::FileWalker;
