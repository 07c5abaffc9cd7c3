//! The scan itself: resolve, parse, traverse, report, one file at a time.
//!
//! Files are handled strictly in the order given. Each translation unit is
//! dropped before the next file is parsed, and nothing is carried between
//! files except the running output and the summary counters.

mod decl;
mod visit;

pub use decl::FunctionDeclaration;
pub use visit::{function_definitions, traverse_declarations};

use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;

use crate::compdb::{ArgumentAdjusters, CompilationDatabase};
use crate::frontend::{self, Frontend};
use crate::report::ReportWriter;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files that produced a translation unit.
    pub files_scanned: usize,
    /// Files without a compile command.
    pub files_skipped: usize,
    /// Files with diagnostics or that could not be parsed at all.
    pub files_with_errors: usize,
    /// Report lines written.
    pub functions: usize,
}

/// Scans source files and reports their function definitions.
pub struct SourceScanner<'a> {
    database: &'a dyn CompilationDatabase,
    frontend: &'a dyn Frontend,
    adjusters: ArgumentAdjusters,
}

impl<'a> SourceScanner<'a> {
    pub fn new(database: &'a dyn CompilationDatabase, frontend: &'a dyn Frontend) -> Self {
        Self {
            database,
            frontend,
            adjusters: ArgumentAdjusters::default(),
        }
    }

    /// Set the rewrites applied to every compile command.
    pub fn adjusters(mut self, adjusters: ArgumentAdjusters) -> Self {
        self.adjusters = adjusters;
        self
    }

    /// Scan `files` in order.
    ///
    /// Report lines go to `report`, diagnostics to `diagnostics`. Per-file
    /// problems never abort the run; only write failures are returned.
    pub fn scan<W: Write, E: Write>(
        &self,
        files: &[PathBuf],
        report: &mut ReportWriter<W>,
        diagnostics: &mut E,
    ) -> io::Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        let start_lines = report.lines();

        for file in files {
            let commands = self.database.compile_commands(file);
            let command = match commands.first() {
                Some(command) => command,
                None => {
                    writeln!(
                        diagnostics,
                        "Skipping {}. Compile command not found.",
                        file.display()
                    )?;
                    summary.files_skipped += 1;
                    continue;
                }
            };
            if commands.len() > 1 {
                log::debug!(
                    "{} has {} compile commands, using the first",
                    file.display(),
                    commands.len()
                );
            }

            let command = self.adjusters.apply(command);
            log::debug!("{}: {}", file.display(), command.arguments.join(" "));

            let tu = match self.frontend.parse(&command) {
                Ok(tu) => tu,
                Err(e) => {
                    writeln!(diagnostics, "{} {}", "error:".red().bold(), e)?;
                    writeln!(diagnostics, "Error while processing {}.", file.display())?;
                    summary.files_with_errors += 1;
                    continue;
                }
            };
            summary.files_scanned += 1;

            let found = frontend::collect_diagnostics(&tu);
            for diagnostic in &found {
                writeln!(diagnostics, "{}", diagnostic)?;
            }

            let before = report.lines();
            let mut write_result = Ok(());
            traverse_declarations(&tu, |declaration| {
                if write_result.is_err() || !declaration.has_body() {
                    return;
                }
                log::trace!(
                    "{}:{}: definition of {}",
                    file.display(),
                    declaration.line(),
                    declaration.name()
                );
                write_result = report.function(declaration.name());
            });
            write_result?;
            report.flush()?;

            log::debug!(
                "{}: {} function definition(s) as {}",
                file.display(),
                report.lines() - before,
                tu.language()
            );

            if let Some(line) = frontend::summary_line(&found) {
                writeln!(diagnostics, "{}", line)?;
                writeln!(diagnostics, "Error while processing {}.", file.display())?;
                summary.files_with_errors += 1;
            }
        }

        summary.functions = report.lines() - start_lines;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compdb::{FixedCompilationDatabase, JsonCompilationDatabase};
    use crate::frontend::TreeSitterFrontend;
    use std::path::Path;

    fn run(
        database: &dyn CompilationDatabase,
        files: &[PathBuf],
    ) -> (String, String, ScanSummary) {
        let frontend = TreeSitterFrontend::new();
        let scanner = SourceScanner::new(database, &frontend);
        let mut report = ReportWriter::new(Vec::new());
        let mut diagnostics = Vec::new();
        let summary = scanner.scan(files, &mut report, &mut diagnostics).unwrap();
        (
            String::from_utf8(report.into_inner()).unwrap(),
            String::from_utf8(diagnostics).unwrap(),
            summary,
        )
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_single_file_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "add.c",
            "int add(int a,int b){return a+b;} void helper();",
        );
        let db = FixedCompilationDatabase::new(dir.path().to_path_buf(), Vec::new());

        let (out, err, summary) = run(&db, &[file]);
        assert_eq!(out, "Function: add\n");
        assert!(err.is_empty(), "unexpected diagnostics: {}", err);
        assert_eq!(summary.functions, 1);
        assert_eq!(summary.files_scanned, 1);
    }

    #[test]
    fn test_files_in_command_line_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "first.c", "void foo(void) {}\n");
        let second = write(
            dir.path(),
            "second.c",
            "void bar(void) {}\nvoid baz(void) {}\n",
        );
        let db = FixedCompilationDatabase::new(dir.path().to_path_buf(), Vec::new());

        let (out, _, _) = run(&db, &[first.clone(), second.clone()]);
        assert_eq!(out, "Function: foo\nFunction: bar\nFunction: baz\n");

        let (reversed, _, _) = run(&db, &[second, first]);
        assert_eq!(reversed, "Function: bar\nFunction: baz\nFunction: foo\n");
    }

    #[test]
    fn test_unlisted_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let listed = write(dir.path(), "listed.c", "int listed(void) { return 0; }\n");
        let unlisted = write(dir.path(), "unlisted.c", "int unlisted(void) { return 0; }\n");
        let content = format!(
            r#"[{{"directory": "{}", "file": "listed.c", "arguments": ["cc", "-c", "listed.c"]}}]"#,
            dir.path().display()
        );
        let db = JsonCompilationDatabase::parse(Path::new("compile_commands.json"), &content)
            .unwrap();

        let (out, err, summary) = run(&db, &[unlisted.clone(), listed]);
        assert_eq!(out, "Function: listed\n");
        assert!(err.contains(&format!(
            "Skipping {}. Compile command not found.",
            unlisted.display()
        )));
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.files_scanned, 1);
    }

    #[test]
    fn test_missing_file_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.c");
        let present = write(dir.path(), "present.c", "void present(void) {}\n");
        let db = FixedCompilationDatabase::new(dir.path().to_path_buf(), Vec::new());

        let (out, err, summary) = run(&db, &[missing, present]);
        assert_eq!(out, "Function: present\n");
        assert!(err.contains("no such file or directory"));
        assert!(err.contains("Error while processing"));
        assert_eq!(summary.files_with_errors, 1);
    }

    #[test]
    fn test_syntax_errors_go_to_diagnostics_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "broken.c",
            "int good(void) { return 0; }\nint bad( { \n",
        );
        let db = FixedCompilationDatabase::new(dir.path().to_path_buf(), Vec::new());

        let (out, err, summary) = run(&db, &[file]);
        assert!(out.starts_with("Function: good\n"), "{}", out);
        assert!(out.lines().all(|line| line.starts_with("Function: ")));
        assert!(err.contains("generated."));
        assert_eq!(summary.files_with_errors, 1);
    }

    #[test]
    fn test_extra_args_select_language() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "api.h",
            "namespace api { inline int version() { return 2; } }\n",
        );
        let db = FixedCompilationDatabase::new(dir.path().to_path_buf(), Vec::new());
        let frontend = TreeSitterFrontend::new();
        let scanner = SourceScanner::new(&db, &frontend)
            .adjusters(ArgumentAdjusters::new(Vec::new(), vec!["-xc++".to_string()]));

        let mut report = ReportWriter::new(Vec::new());
        let mut diagnostics = Vec::new();
        scanner.scan(&[file], &mut report, &mut diagnostics).unwrap();

        assert_eq!(
            String::from_utf8(report.into_inner()).unwrap(),
            "Function: version\n"
        );
        assert!(diagnostics.is_empty());
    }
}
