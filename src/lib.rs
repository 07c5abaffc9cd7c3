//! codeseer - list the function definitions of C and C++ sources.
//!
//! For every source file given, codeseer looks up the compiler invocation in
//! a compilation database, parses the file with tree-sitter, walks the
//! declaration tree and prints `Function: <name>` for each function that has
//! a body.
//!
//! # Architecture
//!
//! - `compdb`: compilation databases (`compile_commands.json`, fixed flags)
//! - `frontend`: compile command to translation unit, plus diagnostics
//! - `scanner`: declaration view, traversal and the per-file loop
//! - `report`: the `Function: <name>` output
//! - `cli`: argument parsing and the run driver

pub mod cli;
pub mod compdb;
pub mod frontend;
pub mod logging;
pub mod report;
pub mod scanner;

pub use compdb::{CompilationDatabase, CompileCommand};
pub use frontend::{Frontend, Language, TranslationUnit, TreeSitterFrontend};
pub use report::ReportWriter;
pub use scanner::{FunctionDeclaration, ScanSummary, SourceScanner};
