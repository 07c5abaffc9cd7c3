//! Source-analysis front end: compile command in, parsed translation unit out.
//!
//! The parsing itself is done by tree-sitter. This module decides which
//! grammar applies to a command, blanks conditional groups the command's
//! macros rule out, owns the resulting tree for the lifetime of one file, and
//! turns error nodes into compiler-style diagnostics.

mod diagnostics;
mod language;
mod preprocess;
mod treesitter;

pub use diagnostics::{collect_diagnostics, summary_line, Diagnostic};
pub use language::{detect_language, Language};
pub use preprocess::{blank_inactive_lines, MacroTable};
pub use treesitter::TreeSitterFrontend;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::compdb::CompileCommand;

/// Errors that prevent a translation unit from being built.
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("no such file or directory: '{}'", .path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to determine the source language of '{}'", .0.display())]
    UnknownLanguage(PathBuf),
    #[error("incompatible grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("parser gave up on '{}'", .0.display())]
    ParseAborted(PathBuf),
}

/// Builds translation units from compile commands.
pub trait Frontend {
    /// Parse the file named by `command`.
    ///
    /// Syntax errors do not fail the parse: the tree is returned with error
    /// nodes in it and `collect_diagnostics` reports them.
    fn parse(&self, command: &CompileCommand) -> Result<TranslationUnit, FrontendError>;
}

/// One parsed source file.
pub struct TranslationUnit {
    tree: tree_sitter::Tree,
    source: Vec<u8>,
    path: PathBuf,
    language: Language,
}

impl TranslationUnit {
    pub fn new(tree: tree_sitter::Tree, source: Vec<u8>, path: PathBuf, language: Language) -> Self {
        Self {
            tree,
            source,
            path,
            language,
        }
    }

    /// Root of the declaration tree.
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Get text for a node of this unit's tree.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether the front end had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

impl std::fmt::Debug for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationUnit")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("bytes", &self.source.len())
            .finish()
    }
}
