//! Command-line interface for codeseer.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::compdb::{self, ArgumentAdjusters};
use crate::frontend::TreeSitterFrontend;
use crate::report::ReportWriter;
use crate::scanner::SourceScanner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;

/// Separator after which the remaining arguments are compiler flags.
const FIXED_ARGS_SEPARATOR: &str = "--";

/// List the function definitions of C and C++ source files.
///
/// Compiler flags for each file come from a compilation database
/// (compile_commands.json or compile_flags.txt), found through --build-path
/// or by searching upwards from the first source file. Flags given after
/// `--` are used for every file instead.
#[derive(Parser, Debug)]
#[command(name = "codeseer")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: codeseer src/main.c -- -std=c11 -Iinclude")]
pub struct Cli {
    /// Source files to scan, in output order
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Build directory containing compile_commands.json or compile_flags.txt
    #[arg(short = 'p', long = "build-path", value_name = "DIR")]
    pub build_path: Option<PathBuf>,

    /// Additional argument to append to every compiler command line
    #[arg(long = "extra-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Additional argument to prepend to every compiler command line
    #[arg(long = "extra-arg-before", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args_before: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Compiler flags given after `--`, if the separator was present.
    #[arg(skip)]
    pub fixed_args: Option<Vec<String>>,
}

impl Cli {
    /// Parse a full argument list, program name first.
    ///
    /// Everything after the first `--` is taken verbatim as compiler flags
    /// before clap sees the rest.
    pub fn parse_with_fixed_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (args, fixed_args) = split_fixed_args(args);
        let mut cli = Cli::parse_from(args);
        cli.fixed_args = fixed_args;
        cli
    }

    fn adjusters(&self) -> ArgumentAdjusters {
        ArgumentAdjusters::new(self.extra_args_before.clone(), self.extra_args.clone())
    }
}

/// Split the argument list at the first `--`.
///
/// Returns the arguments before it and, when the separator is present, the
/// (possibly empty) list after it.
pub fn split_fixed_args<I, T>(args: I) -> (Vec<OsString>, Option<Vec<String>>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut before = Vec::new();
    let mut after: Option<Vec<String>> = None;

    for arg in args {
        let arg = arg.into();
        match after.as_mut() {
            Some(flags) => flags.push(arg.to_string_lossy().into_owned()),
            None if arg.to_str() == Some(FIXED_ARGS_SEPARATOR) => after = Some(Vec::new()),
            None => before.push(arg),
        }
    }

    (before, after)
}

/// Run a scan, writing the report to standard output.
pub fn run_scan(cli: &Cli) -> anyhow::Result<i32> {
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    let stdout = io::stdout();
    let stderr = io::stderr();
    let result = scan_to(cli, &mut stdout.lock(), &mut stderr.lock());

    match result {
        // A closed pipe (`codeseer a.c | head`) is not a failure.
        Err(e) if is_broken_pipe(&e) => Ok(EXIT_SUCCESS),
        other => other,
    }
}

/// Run a scan against arbitrary output streams.
pub fn scan_to<W: Write, E: Write>(
    cli: &Cli,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<i32> {
    let database = match compdb::load(
        &cli.sources,
        cli.build_path.as_deref(),
        cli.fixed_args.as_deref(),
    ) {
        Ok(db) => db,
        Err(e) => {
            writeln!(err, "Error while trying to load a compilation database:")?;
            writeln!(err, "{}", e)?;
            return Ok(EXIT_ERROR);
        }
    };
    log::info!("using {} compilation database", database.kind());

    let frontend = TreeSitterFrontend::new();
    let scanner = SourceScanner::new(database.as_ref(), &frontend).adjusters(cli.adjusters());

    let mut report = ReportWriter::new(out);
    let summary = scanner.scan(&cli.sources, &mut report, err)?;

    log::info!(
        "scanned {} file(s), skipped {}, {} with errors, {} function definition(s)",
        summary.files_scanned,
        summary.files_skipped,
        summary.files_with_errors,
        summary.functions
    );

    Ok(EXIT_SUCCESS)
}

fn is_broken_pipe(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<io::Error>()
        .map(|e| e.kind() == io::ErrorKind::BrokenPipe)
        .unwrap_or(false)
}
