//! Syntax trees for the Aster declaration language.
//!
//! This crate is deliberately small: it owns the lexer, the recursive-descent
//! parser and the immutable AST. Everything downstream (semantic trees,
//! indices, symbols) treats a parsed [`SourceFile`] as an opaque, immutable
//! value: parsing the same text always produces an equal tree, and a tree is
//! never mutated after [`SourceFile::parse`] returns.

pub mod ast;
mod lexer;
mod parser;
mod syntax_error;

pub use crate::syntax_error::SyntaxError;
pub use text_size::{TextRange, TextSize};

use crate::ast::SourceFile;
use std::sync::Arc;

/// The result of parsing: the tree plus the errors encountered on the way.
///
/// Errors do not prevent a tree from being produced; the parser recovers and
/// keeps whatever declarations it could make sense of.
#[derive(Debug, Clone)]
pub struct Parse {
    tree: Arc<SourceFile>,
    errors: Arc<[SyntaxError]>,
}

impl Parse {
    pub fn tree(&self) -> &SourceFile {
        &self.tree
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn ok(self) -> Result<Arc<SourceFile>, Arc<[SyntaxError]>> {
        if self.errors.is_empty() {
            Ok(self.tree)
        } else {
            Err(self.errors)
        }
    }
}

impl SourceFile {
    pub fn parse(text: &str) -> Parse {
        let (tree, errors) = parser::parse_text(text);
        Parse {
            tree: Arc::new(tree),
            errors: errors.into(),
        }
    }
}
