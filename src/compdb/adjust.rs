//! Rewrites applied to every compile command before parsing.

use super::CompileCommand;

/// Flag inserted after the driver; the scan never produces output files.
pub const SYNTAX_ONLY_FLAG: &str = "-fsyntax-only";

/// Dependency-file flags that take a separate value argument.
const DEPENDENCY_FLAGS_WITH_VALUE: &[&str] = &["-MF", "-MT", "-MQ", "-MJ"];

/// Dependency-file flags without a value.
const DEPENDENCY_FLAGS: &[&str] = &["-M", "-MM", "-MD", "-MMD", "-MG", "-MP", "-MV"];

/// Command rewriting configured from `--extra-arg` and `--extra-arg-before`.
///
/// Every command is made syntax-only: output (`-o`, `-c`, `-S`) and
/// dependency-file flags are removed and `-fsyntax-only` is added. The
/// extra arguments are then inserted right after the driver (`before`) or
/// appended (`after`).
#[derive(Debug, Clone, Default)]
pub struct ArgumentAdjusters {
    before: Vec<String>,
    after: Vec<String>,
}

impl ArgumentAdjusters {
    pub fn new(before: Vec<String>, after: Vec<String>) -> Self {
        Self { before, after }
    }

    /// Return an adjusted copy of `command`.
    pub fn apply(&self, command: &CompileCommand) -> CompileCommand {
        let mut arguments = strip_output_arguments(&command.arguments);

        let insert_at = usize::from(!arguments.is_empty());
        let mut prefix = Vec::with_capacity(self.before.len() + 1);
        prefix.push(SYNTAX_ONLY_FLAG.to_string());
        prefix.extend(self.before.iter().cloned());
        arguments.splice(insert_at..insert_at, prefix);

        arguments.extend(self.after.iter().cloned());

        CompileCommand {
            arguments,
            ..command.clone()
        }
    }
}

fn strip_output_arguments(arguments: &[String]) -> Vec<String> {
    let mut kept = Vec::with_capacity(arguments.len());
    let mut iter = arguments.iter().enumerate();

    while let Some((index, arg)) = iter.next() {
        if index == 0 {
            kept.push(arg.clone());
            continue;
        }
        let arg_str = arg.as_str();
        if arg_str == "-o" || DEPENDENCY_FLAGS_WITH_VALUE.contains(&arg_str) {
            iter.next();
            continue;
        }
        if arg_str.starts_with("-o")
            || arg_str == "-c"
            || arg_str == "-S"
            || arg_str == SYNTAX_ONLY_FLAG
            || DEPENDENCY_FLAGS.contains(&arg_str)
            || DEPENDENCY_FLAGS_WITH_VALUE
                .iter()
                .any(|flag| arg_str.starts_with(flag))
        {
            continue;
        }
        kept.push(arg.clone());
    }

    kept
}
