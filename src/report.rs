//! Output of the scan: one `Function: <name>` line per definition.

use std::io::{self, Write};

/// Label printed in front of every function name.
pub const FUNCTION_LABEL: &str = "Function: ";

/// Writes report lines to any sink (standard output in the binary).
pub struct ReportWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Write one report line.
    pub fn function(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "{}{}", FUNCTION_LABEL, name)?;
        self.lines += 1;
        Ok(())
    }

    /// Flush after each translation unit so output interleaves with diagnostics.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
