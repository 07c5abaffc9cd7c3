//! `compile_commands.json` support.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{normalize_path, CompilationDatabase, CompilationDatabaseError, CompileCommand};

/// One entry as written by CMake, Bear, Meson and friends.
#[derive(Debug, Deserialize)]
struct Entry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    output: Option<PathBuf>,
}

/// Compilation database backed by a `compile_commands.json` file.
#[derive(Debug, Default)]
pub struct JsonCompilationDatabase {
    /// Commands keyed by normalized absolute source path.
    commands: HashMap<PathBuf, Vec<CompileCommand>>,
    /// Source files in the order they first appear in the file.
    files: Vec<PathBuf>,
}

impl JsonCompilationDatabase {
    /// Load and validate a database file.
    pub fn load(path: &Path) -> Result<Self, CompilationDatabaseError> {
        let content = fs::read_to_string(path).map_err(|source| CompilationDatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let base = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
        Self::parse_with_base(path, &content, &base)
    }

    /// Parse database content; `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self, CompilationDatabaseError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::parse_with_base(path, content, &cwd)
    }

    /// Parse database content, resolving relative `directory` fields against `base`.
    pub fn parse_with_base(
        path: &Path,
        content: &str,
        base: &Path,
    ) -> Result<Self, CompilationDatabaseError> {
        let entries: Vec<Entry> =
            serde_json::from_str(content).map_err(|source| CompilationDatabaseError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut db = Self::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let arguments = match (entry.arguments, entry.command) {
                (Some(arguments), _) => arguments,
                (None, Some(command)) => split_command_line(&command).ok_or_else(|| {
                    CompilationDatabaseError::UnterminatedQuote {
                        path: path.to_path_buf(),
                        index,
                    }
                })?,
                (None, None) => {
                    return Err(CompilationDatabaseError::MissingCommand {
                        path: path.to_path_buf(),
                        index,
                    })
                }
            };

            let directory = normalize_path(base, &entry.directory);
            let key = normalize_path(&directory, &entry.file);
            let command = CompileCommand {
                directory,
                filename: entry.file,
                arguments,
                output: entry.output,
            };
            db.insert(key, command);
        }

        log::debug!(
            "compilation database {} lists {} file(s)",
            path.display(),
            db.files.len()
        );
        Ok(db)
    }

    fn insert(&mut self, key: PathBuf, command: CompileCommand) {
        if !self.commands.contains_key(&key) {
            self.files.push(key.clone());
        }
        self.commands.entry(key).or_default().push(command);
    }

    fn lookup(&self, key: &Path) -> Option<&Vec<CompileCommand>> {
        if let Some(commands) = self.commands.get(key) {
            return Some(commands);
        }
        // The database may spell the path through a symlink the caller did not use.
        let canonical = fs::canonicalize(key).ok()?;
        self.commands.get(&canonical).or_else(|| {
            self.commands
                .iter()
                .find(|(listed, _)| fs::canonicalize(listed).ok().as_ref() == Some(&canonical))
                .map(|(_, commands)| commands)
        })
    }
}

impl CompilationDatabase for JsonCompilationDatabase {
    fn compile_commands(&self, file: &Path) -> Vec<CompileCommand> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let key = normalize_path(&cwd, file);
        self.lookup(&key).cloned().unwrap_or_default()
    }

    fn all_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn kind(&self) -> &'static str {
        "json"
    }
}

/// Split a `command` string into arguments using shell quoting rules.
///
/// Whitespace separates arguments. Single quotes are literal, double quotes
/// allow backslash escapes, and a backslash outside quotes escapes the next
/// character. Returns `None` for an unterminated quote or trailing backslash.
pub fn split_command_line(command: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            '\\' => {
                current.push(chars.next()?);
                in_arg = true;
            }
            '\'' => {
                loop {
                    match chars.next()? {
                        '\'' => break,
                        other => current.push(other),
                    }
                }
                in_arg = true;
            }
            '"' => {
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => current.push(chars.next()?),
                        other => current.push(other),
                    }
                }
                in_arg = true;
            }
            other => {
                current.push(other);
                in_arg = true;
            }
        }
    }

    if in_arg {
        args.push(current);
    }
    Some(args)
}
