//! Compilation databases: which compiler invocation parses which file.
//!
//! This module provides:
//! - `CompilationDatabase` trait: lookup of compile commands by source path
//! - `JsonCompilationDatabase`: `compile_commands.json` as written by build systems
//! - `FixedCompilationDatabase`: one flag list for every file (`--` or `compile_flags.txt`)
//! - `ArgumentAdjusters`: rewrites applied to every resolved command
//! - Discovery of a database from `-p`, `--`, or the first source file

mod adjust;
mod fixed;
mod json;

pub use adjust::ArgumentAdjusters;
pub use fixed::FixedCompilationDatabase;
pub use json::{split_command_line, JsonCompilationDatabase};

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// File name of a JSON compilation database.
pub const JSON_DATABASE_NAME: &str = "compile_commands.json";

/// File name of a fixed flag list.
pub const FLAGS_FILE_NAME: &str = "compile_flags.txt";

/// Errors raised while loading a compilation database.
#[derive(Error, Debug)]
pub enum CompilationDatabaseError {
    #[error("no compilation database found in {} (looked for compile_commands.json and compile_flags.txt)", .0.display())]
    NotFound(PathBuf),
    #[error(
        "could not auto-detect a compilation database for {}: none found in its directory or any parent directory\n\
         pass compiler flags after `--` to scan without one",
        .0.display()
    )]
    AutoDetectFailed(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed compilation database {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed compilation database {}: entry {index} has neither \"arguments\" nor \"command\"", .path.display())]
    MissingCommand { path: PathBuf, index: usize },
    #[error("malformed compilation database {}: unterminated quote or escape in entry {index}", .path.display())]
    UnterminatedQuote { path: PathBuf, index: usize },
}

/// One compiler invocation for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    /// Working directory of the invocation.
    pub directory: PathBuf,
    /// The source file, as written in the database.
    pub filename: PathBuf,
    /// Full command line; `arguments[0]` is the compiler driver.
    pub arguments: Vec<String>,
    /// The output file, if the database records one.
    pub output: Option<PathBuf>,
}

impl CompileCommand {
    /// The source file resolved against the working directory.
    pub fn source_path(&self) -> PathBuf {
        if self.filename.is_absolute() {
            self.filename.clone()
        } else {
            self.directory.join(&self.filename)
        }
    }

    /// The compiler driver (first argument), if any.
    pub fn driver(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }
}

/// Lookup of compile commands by source path.
pub trait CompilationDatabase {
    /// All commands recorded for `file`, in database order.
    ///
    /// Returns an empty list when the file is unknown (not an error).
    fn compile_commands(&self, file: &Path) -> Vec<CompileCommand>;

    /// Every file the database knows about.
    fn all_files(&self) -> Vec<PathBuf>;

    /// Short name used in log output.
    fn kind(&self) -> &'static str;
}

/// Load the compilation database for a run.
///
/// Precedence follows the usual tooling convention: flags after `--` win,
/// then an explicit build path, then auto-detection from the first source.
pub fn load(
    sources: &[PathBuf],
    build_path: Option<&Path>,
    fixed_args: Option<&[String]>,
) -> Result<Box<dyn CompilationDatabase>, CompilationDatabaseError> {
    if let Some(args) = fixed_args {
        if build_path.is_some() {
            log::warn!("ignoring --build-path: compiler flags were given after `--`");
        }
        let cwd = current_dir()?;
        log::debug!("using fixed compilation database with {} flag(s)", args.len());
        return Ok(Box::new(FixedCompilationDatabase::new(cwd, args.to_vec())));
    }

    if let Some(dir) = build_path {
        return load_from_directory(dir)?
            .ok_or_else(|| CompilationDatabaseError::NotFound(dir.to_path_buf()));
    }

    let first = match sources.first() {
        Some(first) => first,
        None => return Err(CompilationDatabaseError::AutoDetectFailed(PathBuf::new())),
    };
    auto_detect_from_source(first)
}

/// Try to load a database from exactly one directory.
///
/// Returns `Ok(None)` when the directory holds neither database file.
pub fn load_from_directory(
    dir: &Path,
) -> Result<Option<Box<dyn CompilationDatabase>>, CompilationDatabaseError> {
    let json_path = dir.join(JSON_DATABASE_NAME);
    if json_path.is_file() {
        log::debug!("loading {}", json_path.display());
        let db = JsonCompilationDatabase::load(&json_path)?;
        return Ok(Some(Box::new(db)));
    }

    let flags_path = dir.join(FLAGS_FILE_NAME);
    if flags_path.is_file() {
        log::debug!("loading {}", flags_path.display());
        let db = FixedCompilationDatabase::load(&flags_path)?;
        return Ok(Some(Box::new(db)));
    }

    Ok(None)
}

/// Walk from the source file's directory to the root, loading the first database found.
pub fn auto_detect_from_source(
    source: &Path,
) -> Result<Box<dyn CompilationDatabase>, CompilationDatabaseError> {
    let cwd = current_dir()?;
    let absolute = normalize_path(&cwd, source);

    let mut dir = absolute.parent();
    while let Some(current) = dir {
        if let Some(db) = load_from_directory(current)? {
            log::info!("auto-detected compilation database in {}", current.display());
            return Ok(db);
        }
        dir = current.parent();
    }

    Err(CompilationDatabaseError::AutoDetectFailed(source.to_path_buf()))
}

/// Make `path` absolute against `base` and resolve `.` and `..` lexically.
///
/// Symlinks are not followed; callers that need that compare canonical
/// paths as a second step.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn current_dir() -> Result<PathBuf, CompilationDatabaseError> {
    std::env::current_dir().map_err(|source| CompilationDatabaseError::Io {
        path: PathBuf::from("."),
        source,
    })
}
