//! Whitespace-delimited command lines for the editor and validator.
//!
//! Command lines are split into a program and its arguments without any
//! shell involvement, so paths containing metacharacters are passed through
//! untouched when the command is eventually spawned.

use std::fmt;

/// Environment variables consulted, in order, for the operator's editor.
pub const EDITOR_ENV_VARS: [&str; 2] = ["EDITOR", "VISUAL"];

/// A program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Splits `text` on ASCII whitespace. Returns `None` for blank input.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_ascii_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// A command line consisting of a single program.
    #[must_use]
    pub fn bare(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments placed before any per-invocation arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
