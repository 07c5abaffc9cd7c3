//! Tree-sitter backed front end for C and C++.

use std::fs;
use std::io::ErrorKind;

use tree_sitter::Parser;

use super::{
    blank_inactive_lines, detect_language, Frontend, FrontendError, Language, MacroTable,
    TranslationUnit,
};
use crate::compdb::CompileCommand;

/// Parses C with `tree-sitter-c` and C++ with `tree-sitter-cpp`.
///
/// Conditional groups ruled out by the known macros are blanked first.
/// Other directives stay in the tree unexpanded, and headers are not read.
pub struct TreeSitterFrontend {
    c: tree_sitter::Language,
    cpp: tree_sitter::Language,
}

impl TreeSitterFrontend {
    pub fn new() -> Self {
        Self {
            c: tree_sitter_c::LANGUAGE.into(),
            cpp: tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    fn grammar(&self, language: Language) -> &tree_sitter::Language {
        match language {
            Language::C => &self.c,
            Language::Cpp => &self.cpp,
        }
    }

    /// Parse in-memory source with an explicit language and only its predefined macros.
    pub fn parse_source(
        &self,
        path: &std::path::Path,
        source: Vec<u8>,
        language: Language,
    ) -> Result<TranslationUnit, FrontendError> {
        self.parse_with_macros(path, source, language, MacroTable::for_language(language))
    }

    /// Parse in-memory source after blanking the groups `macros` rule out.
    pub fn parse_with_macros(
        &self,
        path: &std::path::Path,
        mut source: Vec<u8>,
        language: Language,
        macros: MacroTable,
    ) -> Result<TranslationUnit, FrontendError> {
        let blanked = blank_inactive_lines(&mut source, macros);
        if blanked > 0 {
            log::debug!("{}: {} inactive line(s) blanked", path.display(), blanked);
        }

        let mut parser = Parser::new();
        parser.set_language(self.grammar(language))?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| FrontendError::ParseAborted(path.to_path_buf()))?;
        Ok(TranslationUnit::new(tree, source, path.to_path_buf(), language))
    }
}

impl Default for TreeSitterFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for TreeSitterFrontend {
    fn parse(&self, command: &CompileCommand) -> Result<TranslationUnit, FrontendError> {
        let language = detect_language(command)
            .ok_or_else(|| FrontendError::UnknownLanguage(command.filename.clone()))?;

        let path = command.source_path();
        let source = fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => FrontendError::NotFound {
                path: command.filename.clone(),
            },
            _ => FrontendError::Read {
                path: command.filename.clone(),
                source,
            },
        })?;

        log::debug!(
            "parsing {} as {} ({} bytes)",
            path.display(),
            language,
            source.len()
        );
        // Diagnostics name the file the way the command spells it.
        let macros = MacroTable::from_arguments(&command.arguments, language);
        self.parse_with_macros(&command.filename, source, language, macros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn command(dir: &Path, file: &str, args: &[&str]) -> CompileCommand {
        CompileCommand {
            directory: dir.to_path_buf(),
            filename: PathBuf::from(file),
            arguments: args.iter().map(|s| s.to_string()).collect(),
            output: None,
        }
    }

    #[test]
    fn test_parse_c_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "int main(void) { return 0; }\n").unwrap();

        let tu = TreeSitterFrontend::new()
            .parse(&command(dir.path(), "a.c", &["cc", "a.c"]))
            .unwrap();
        assert_eq!(tu.language(), Language::C);
        assert_eq!(tu.root().kind(), "translation_unit");
        assert!(!tu.has_errors());
        assert_eq!(tu.path(), Path::new("a.c"));
    }

    #[test]
    fn test_language_follows_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.h"), "namespace n { void f() {} }\n").unwrap();

        let frontend = TreeSitterFrontend::new();
        let as_cpp = frontend
            .parse(&command(dir.path(), "a.h", &["cc", "-xc++", "a.h"]))
            .unwrap();
        assert_eq!(as_cpp.language(), Language::Cpp);
        assert!(!as_cpp.has_errors());

        let as_c = frontend
            .parse(&command(dir.path(), "a.h", &["cc", "a.h"]))
            .unwrap();
        assert_eq!(as_c.language(), Language::C);
    }

    #[test]
    fn test_command_macros_select_branches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pick.c"),
            "#ifdef USE_FAST\nint fast(void) { return 1; }\n#else\nint slow(void) { return 2; }\n#endif\n",
        )
        .unwrap();

        let frontend = TreeSitterFrontend::new();
        let tu = frontend
            .parse(&command(dir.path(), "pick.c", &["cc", "-DUSE_FAST", "pick.c"]))
            .unwrap();
        let text = String::from_utf8_lossy(tu.source()).into_owned();
        assert!(text.contains("int fast(void)"));
        assert!(!text.contains("int slow(void)"));
        assert!(!tu.has_errors());

        let tu = frontend
            .parse(&command(dir.path(), "pick.c", &["cc", "-UUSE_FAST", "pick.c"]))
            .unwrap();
        let text = String::from_utf8_lossy(tu.source()).into_owned();
        assert!(!text.contains("int fast(void)"));
        assert!(text.contains("int slow(void)"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TreeSitterFrontend::new()
            .parse(&command(dir.path(), "nope.c", &["cc", "nope.c"]))
            .unwrap_err();
        assert!(matches!(err, FrontendError::NotFound { .. }));
        assert_eq!(err.to_string(), "no such file or directory: 'nope.c'");
    }

    #[test]
    fn test_unknown_language() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let err = TreeSitterFrontend::new()
            .parse(&command(dir.path(), "a.txt", &["cc", "a.txt"]))
            .unwrap_err();
        assert!(matches!(err, FrontendError::UnknownLanguage(_)));
    }
}
