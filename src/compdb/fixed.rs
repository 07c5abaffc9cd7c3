//! A compilation database that applies one flag list to every file.

use std::fs;
use std::path::{Path, PathBuf};

use super::{normalize_path, CompilationDatabase, CompilationDatabaseError, CompileCommand};

/// Driver name placed in front of fixed flags.
pub const FIXED_DRIVER: &str = "clang-tool";

/// Same flags for every source file.
///
/// Built from the arguments after `--` on the command line, or from a
/// `compile_flags.txt` file (one flag per line).
#[derive(Debug, Clone)]
pub struct FixedCompilationDatabase {
    directory: PathBuf,
    flags: Vec<String>,
}

impl FixedCompilationDatabase {
    pub fn new(directory: PathBuf, flags: Vec<String>) -> Self {
        Self { directory, flags }
    }

    /// Load a `compile_flags.txt` file. Its directory becomes the working directory.
    pub fn load(path: &Path) -> Result<Self, CompilationDatabaseError> {
        let content = fs::read_to_string(path).map_err(|source| CompilationDatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(directory, parse_flags(&content)))
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

impl CompilationDatabase for FixedCompilationDatabase {
    fn compile_commands(&self, file: &Path) -> Vec<CompileCommand> {
        let mut arguments = Vec::with_capacity(self.flags.len() + 2);
        arguments.push(FIXED_DRIVER.to_string());
        arguments.extend(self.flags.iter().cloned());
        arguments.push(file.to_string_lossy().into_owned());

        // Relative sources are relative to where the tool runs, not to `directory`.
        let cwd = std::env::current_dir().unwrap_or_default();
        vec![CompileCommand {
            directory: self.directory.clone(),
            filename: normalize_path(&cwd, file),
            arguments,
            output: None,
        }]
    }

    fn all_files(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }
}

/// One flag per line; surrounding whitespace and blank lines are dropped.
fn parse_flags(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_file_gets_the_flags() {
        let db = FixedCompilationDatabase::new(
            PathBuf::from("/work"),
            vec!["-std=c99".to_string(), "-Iinclude".to_string()],
        );

        let commands = db.compile_commands(Path::new("src/a.c"));
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].arguments,
            vec!["clang-tool", "-std=c99", "-Iinclude", "src/a.c"]
        );
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(commands[0].source_path(), cwd.join("src/a.c"));
        assert_eq!(commands[0].directory, PathBuf::from("/work"));
        assert!(db.all_files().is_empty());
    }

    #[test]
    fn test_empty_flags() {
        let db = FixedCompilationDatabase::new(PathBuf::from("/"), Vec::new());
        let commands = db.compile_commands(Path::new("/x.cc"));
        assert_eq!(commands[0].arguments, vec!["clang-tool", "/x.cc"]);
    }

    #[test]
    fn test_load_flags_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_flags.txt");
        std::fs::write(&path, "-xc++\n\n  -std=c++20  \n-DDEBUG\n").unwrap();

        let db = FixedCompilationDatabase::load(&path).unwrap();
        assert_eq!(db.flags(), &["-xc++", "-std=c++20", "-DDEBUG"]);
        assert_eq!(
            db.compile_commands(Path::new("a.cc"))[0].directory,
            dir.path().to_path_buf()
        );
    }
}
