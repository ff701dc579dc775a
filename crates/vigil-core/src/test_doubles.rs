//! Scripted collaborators for exercising sessions without a terminal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::ExitStatus;

use crate::editor::{Editor, EditorError};
use crate::prompt::{Choice, Operator};
use crate::validator::{ValidationOutcome, ValidationReport, Validator, ValidatorError};

const SCRIPTED_EDITOR: &str = "scripted-editor";

/// One scripted editor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorStep {
    /// Replace the staged content.
    Write(String),
    /// Leave the staged content untouched.
    Keep,
    /// Exit with the given status code without touching the file.
    Exit(i32),
}

/// Editor that plays back [`EditorStep`]s and records the requested lines.
///
/// Once the script runs out every further invocation keeps the content.
#[derive(Debug, Default)]
pub struct ScriptedEditor {
    steps: RefCell<VecDeque<EditorStep>>,
    lines: RefCell<Vec<Option<u32>>>,
}

impl ScriptedEditor {
    /// Builds an editor that performs `steps` in order.
    pub fn new(steps: impl IntoIterator<Item = EditorStep>) -> Self {
        Self {
            steps: RefCell::new(steps.into_iter().collect()),
            lines: RefCell::new(Vec::new()),
        }
    }

    /// Line positions requested so far, one entry per invocation.
    #[must_use]
    pub fn requested_lines(&self) -> Vec<Option<u32>> {
        self.lines.borrow().clone()
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.lines.borrow().len()
    }
}

impl Editor for ScriptedEditor {
    fn edit(&self, staged: &Path, line: Option<u32>) -> Result<(), EditorError> {
        self.lines.borrow_mut().push(line);
        let step = self.steps.borrow_mut().pop_front().unwrap_or(EditorStep::Keep);
        match step {
            EditorStep::Write(content) => {
                fs::write(staged, content).map_err(|source| EditorError::Launch {
                    command: String::from(SCRIPTED_EDITOR),
                    source,
                })
            }
            EditorStep::Keep => Ok(()),
            EditorStep::Exit(code) => Err(EditorError::Status {
                command: String::from(SCRIPTED_EDITOR),
                status: ExitStatus::from_raw(code << 8),
            }),
        }
    }
}

/// Validator that rejects the first line containing a marker.
#[derive(Debug)]
pub struct MarkerValidator {
    marker: String,
    locate: bool,
    runs: Cell<usize>,
}

impl MarkerValidator {
    /// Rejects content containing `marker`, reporting its line.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            locate: true,
            runs: Cell::new(0),
        }
    }

    /// Rejects content containing `marker` without reporting a line.
    pub fn unlocated(marker: impl Into<String>) -> Self {
        Self {
            locate: false,
            ..Self::new(marker)
        }
    }

    /// Number of validations performed.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl Validator for MarkerValidator {
    fn validate(&self, staged: &Path) -> Result<ValidationReport, ValidatorError> {
        self.runs.set(self.runs.get() + 1);
        let content = fs::read_to_string(staged).map_err(|source| ValidatorError::Launch {
            command: String::from("marker-validator"),
            source,
        })?;
        let Some(index) = content.lines().position(|line| line.contains(&self.marker)) else {
            return Ok(ValidationReport::clean());
        };
        let outcome = match u32::try_from(index + 1) {
            Ok(line) if self.locate => ValidationOutcome::ErrorAtLine(line),
            _ => ValidationOutcome::ErrorUnknown,
        };
        Ok(ValidationReport::new(
            outcome,
            format!("syntax error: unexpected '{}'", self.marker),
        ))
    }
}

/// Operator that answers from a script and exits once it runs out.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    choices: VecDeque<Choice>,
    asked: usize,
}

impl ScriptedOperator {
    /// Builds an operator that answers with `choices` in order.
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of times the operator was asked.
    #[must_use]
    pub const fn asked(&self) -> usize {
        self.asked
    }
}

impl Operator for ScriptedOperator {
    fn choose(&mut self) -> std::io::Result<Choice> {
        self.asked += 1;
        Ok(self.choices.pop_front().unwrap_or(Choice::Exit))
    }
}
