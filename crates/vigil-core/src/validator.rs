//! Syntax validation of the staged file.
//!
//! A validator never fails the session because content is wrong: it
//! returns a [`ValidationOutcome`] that the operator resolves. Only an
//! inability to run the check at all is a [`ValidatorError`].

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;
use vigil_config::CommandLine;

use crate::subprocess::command_for;

const VALIDATOR_TARGET: &str = "vigil::validator";

/// Result of checking the staged content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The content parsed cleanly.
    Clean,
    /// The content is invalid and the first error is on this 1-based line.
    ErrorAtLine(u32),
    /// The content is invalid at an unknown location.
    ErrorUnknown,
}

impl ValidationOutcome {
    /// Returns true for [`ValidationOutcome::Clean`].
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Line to reopen the editor at, if the error was located.
    #[must_use]
    pub const fn line(self) -> Option<u32> {
        match self {
            Self::ErrorAtLine(line) => Some(line),
            Self::Clean | Self::ErrorUnknown => None,
        }
    }
}

/// A validation outcome plus whatever the checker printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Verdict on the staged content.
    pub outcome: ValidationOutcome,
    /// Diagnostic text, empty when the checker was silent.
    pub diagnostics: String,
}

impl ValidationReport {
    /// A clean report with no diagnostics.
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            outcome: ValidationOutcome::Clean,
            diagnostics: String::new(),
        }
    }

    /// A report carrying `outcome` and `diagnostics`.
    #[must_use]
    pub fn new(outcome: ValidationOutcome, diagnostics: impl Into<String>) -> Self {
        Self {
            outcome,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Errors raised when the check itself cannot be carried out.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The validator program could not be started.
    #[error("unable to run validator {command}: {source}")]
    Launch {
        /// Validator command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The validator was killed before reaching a verdict.
    #[error("validator ({command}) terminated abnormally: {status}")]
    Terminated {
        /// Validator command line.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
}

/// Checks the staged file for syntax errors.
pub trait Validator {
    /// Parses the file at `staged`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] only when no verdict could be reached.
    fn validate(&self, staged: &Path) -> Result<ValidationReport, ValidatorError>;
}

/// Runs `<program> <args> <staged>` and reads the verdict from its exit
/// status.
///
/// On a non-zero exit the error line is taken from the first `line N`
/// phrase or `<staged>:N` location found in stderr, then stdout.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    command: CommandLine,
}

impl CommandValidator {
    /// Wraps a validator command line.
    #[must_use]
    pub const fn new(command: CommandLine) -> Self {
        Self { command }
    }
}

impl Validator for CommandValidator {
    fn validate(&self, staged: &Path) -> Result<ValidationReport, ValidatorError> {
        let mut command = command_for(&self.command);
        command
            .arg(staged)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            target: VALIDATOR_TARGET,
            validator = %self.command,
            path = %staged.display(),
            "running validator"
        );
        let output = command.output().map_err(|source| ValidatorError::Launch {
            command: self.command.to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = join_streams(&stderr, &stdout);

        if output.status.success() {
            return Ok(ValidationReport::new(ValidationOutcome::Clean, diagnostics));
        }
        if output.status.code().is_none() {
            return Err(ValidatorError::Terminated {
                command: self.command.to_string(),
                status: output.status,
            });
        }

        let outcome = locate_error_line(&stderr, staged)
            .or_else(|| locate_error_line(&stdout, staged))
            .map_or(ValidationOutcome::ErrorUnknown, ValidationOutcome::ErrorAtLine);
        debug!(
            target: VALIDATOR_TARGET,
            status = %output.status,
            ?outcome,
            "validator rejected staged content"
        );
        Ok(ValidationReport::new(outcome, diagnostics))
    }
}

/// Accepts any content. Used when no validator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptingValidator;

impl Validator for AcceptingValidator {
    fn validate(&self, _staged: &Path) -> Result<ValidationReport, ValidatorError> {
        Ok(ValidationReport::clean())
    }
}

fn join_streams(stderr: &str, stdout: &str) -> String {
    [stderr.trim_end(), stdout.trim_end()]
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finds the first error line reported in `text`.
///
/// Recognises `<staged>:N` locations and `line N` phrases in any letter
/// case. Line zero is not a location.
#[must_use]
pub fn locate_error_line(text: &str, staged: &Path) -> Option<u32> {
    let staged = staged.to_string_lossy();
    text.lines().find_map(|line| {
        let located = line
            .split_once(staged.as_ref())
            .and_then(|(_, rest)| rest.strip_prefix(':'))
            .and_then(leading_number);
        located.or_else(|| {
            line.to_ascii_lowercase()
                .split("line ")
                .skip(1)
                .find_map(|rest| leading_number(rest.trim_start()))
        })
    })
}

fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|line| *line > 0)
}
