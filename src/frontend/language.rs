//! Source language selection from a compile command.

use std::fmt;
use std::path::Path;

use crate::compdb::CompileCommand;

/// Languages the front end has grammars for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "c++",
        }
    }

    /// Language implied by a file extension (case-sensitive, `.C` is C++).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" | "h" | "i" => Some(Language::C),
            "cc" | "cp" | "cpp" | "cxx" | "c++" | "C" | "CC" | "CPP" | "hh" | "hpp" | "hxx"
            | "h++" | "H" | "ii" | "ipp" | "tcc" | "inl" | "ixx" | "cppm" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Language named by a `-x` value.
    fn from_x_value(value: &str) -> Option<Self> {
        match value {
            "c" | "c-header" | "cpp-output" => Some(Language::C),
            "c++" | "c++-header" | "c++-cpp-output" | "c++-module" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Language named by a `-std=` value.
    fn from_std_value(value: &str) -> Option<Self> {
        if value.starts_with("c++") || value.starts_with("gnu++") {
            Some(Language::Cpp)
        } else if value.starts_with('c') || value.starts_with("gnu") || value.starts_with("iso9899") {
            Some(Language::C)
        } else {
            None
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pick the language for a command.
///
/// Precedence: the last `-x`, then the last `-std=`, then a C++ driver
/// (`--driver-mode=g++` or a name ending in `++`), then the file extension.
pub fn detect_language(command: &CompileCommand) -> Option<Language> {
    let args = command.arguments.get(1..).unwrap_or(&[]);

    let mut from_x = None;
    let mut from_std = None;
    let mut driver_mode = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-x" {
            if let Some(value) = iter.next() {
                from_x = Language::from_x_value(value).or(from_x);
            }
        } else if let Some(value) = arg.strip_prefix("-x") {
            from_x = Language::from_x_value(value).or(from_x);
        } else if let Some(value) = arg
            .strip_prefix("-std=")
            .or_else(|| arg.strip_prefix("--std="))
        {
            from_std = Language::from_std_value(value).or(from_std);
        } else if let Some(value) = arg.strip_prefix("--driver-mode=") {
            driver_mode = Some(value == "g++");
        }
    }

    if let Some(language) = from_x.or(from_std) {
        return Some(language);
    }

    let cpp_driver = driver_mode.unwrap_or_else(|| {
        command
            .driver()
            .and_then(|driver| Path::new(driver).file_name())
            .map(|name| {
                let name = name.to_string_lossy();
                let name = name.strip_suffix(".exe").unwrap_or(&name);
                name.ends_with("++")
            })
            .unwrap_or(false)
    });
    if cpp_driver {
        return Some(Language::Cpp);
    }

    command
        .filename
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn command(file: &str, args: &[&str]) -> CompileCommand {
        CompileCommand {
            directory: PathBuf::from("/p"),
            filename: PathBuf::from(file),
            arguments: args.iter().map(|s| s.to_string()).collect(),
            output: None,
        }
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(detect_language(&command("a.c", &["cc", "a.c"])), Some(Language::C));
        assert_eq!(detect_language(&command("a.h", &["cc", "a.h"])), Some(Language::C));
        assert_eq!(detect_language(&command("a.cpp", &["cc", "a.cpp"])), Some(Language::Cpp));
        assert_eq!(detect_language(&command("a.C", &["cc", "a.C"])), Some(Language::Cpp));
        assert_eq!(detect_language(&command("a.f90", &["cc", "a.f90"])), None);
    }

    #[test]
    fn test_cpp_driver_wins_over_extension() {
        assert_eq!(
            detect_language(&command("a.h", &["/usr/bin/clang++", "a.h"])),
            Some(Language::Cpp)
        );
        assert_eq!(
            detect_language(&command("a.h", &["g++.exe", "a.h"])),
            Some(Language::Cpp)
        );
        assert_eq!(
            detect_language(&command("a.h", &["clang", "--driver-mode=g++", "a.h"])),
            Some(Language::Cpp)
        );
        assert_eq!(
            detect_language(&command("a.c", &["clang++", "--driver-mode=gcc", "a.c"])),
            Some(Language::C)
        );
    }

    #[test]
    fn test_std_wins_over_driver() {
        assert_eq!(
            detect_language(&command("a.h", &["c++", "-std=c11", "a.h"])),
            Some(Language::C)
        );
        assert_eq!(
            detect_language(&command("a.h", &["cc", "--std=gnu++17", "a.h"])),
            Some(Language::Cpp)
        );
    }

    #[test]
    fn test_last_x_wins() {
        assert_eq!(
            detect_language(&command("a.c", &["cc", "-x", "c", "-xc++", "-std=c99", "a.c"])),
            Some(Language::Cpp)
        );
        assert_eq!(
            detect_language(&command("a.cc", &["c++", "-x", "c-header", "a.cc"])),
            Some(Language::C)
        );
    }
}
