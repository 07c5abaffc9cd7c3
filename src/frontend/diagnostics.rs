//! Compiler-style diagnostics for syntax errors found by the front end.

use std::fmt;
use std::path::PathBuf;

use colored::*;

use super::TranslationUnit;

/// Longest source excerpt quoted in an error message.
const MAX_EXCERPT_CHARS: usize = 24;

/// One syntax error, positioned 1-indexed like compiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    /// `<path>:<line>:<col>: error: <message>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            format!("{}:{}:{}:", self.path.display(), self.line, self.column).bold(),
            "error:".red().bold(),
            self.message.bold()
        )
    }
}

/// Collect one diagnostic per error or missing node, in source order.
///
/// Children of an error node are not inspected again.
pub fn collect_diagnostics(tu: &TranslationUnit) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if !tu.has_errors() {
        return diagnostics;
    }

    let mut cursor = tu.root().walk();
    loop {
        let node = cursor.node();
        let descend = if node.is_error() {
            diagnostics.push(diagnostic(tu, node, unexpected_message(tu, node)));
            false
        } else if node.is_missing() {
            diagnostics.push(diagnostic(tu, node, format!("expected '{}'", node.kind())));
            false
        } else {
            node.has_error()
        };

        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return diagnostics;
            }
        }
    }
}

/// `N error(s) generated.` summary line, or `None` when there were no errors.
pub fn summary_line(diagnostics: &[Diagnostic]) -> Option<String> {
    match diagnostics.len() {
        0 => None,
        1 => Some("1 error generated.".to_string()),
        n => Some(format!("{} errors generated.", n)),
    }
}

fn diagnostic(tu: &TranslationUnit, node: tree_sitter::Node, message: String) -> Diagnostic {
    let position = node.start_position();
    Diagnostic {
        path: tu.path().to_path_buf(),
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

fn unexpected_message(tu: &TranslationUnit, node: tree_sitter::Node) -> String {
    let text = tu.node_text(node);
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "unexpected end of input".to_string();
    }
    let excerpt: String = first_line.chars().take(MAX_EXCERPT_CHARS).collect();
    if excerpt.len() < first_line.len() {
        format!("unexpected '{}...'", excerpt)
    } else {
        format!("unexpected '{}'", excerpt)
    }
}
