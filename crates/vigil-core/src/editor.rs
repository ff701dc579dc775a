//! Launching the operator's editor on the staged file.

use std::io;
use std::path::Path;
use std::process::ExitStatus;

use thiserror::Error;
use tracing::debug;
use vigil_config::CommandLine;

use crate::subprocess::command_for;

const EDITOR_TARGET: &str = "vigil::editor";

/// Errors raised while running the editor.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The editor could not be started.
    #[error("unable to run {command}: {source}")]
    Launch {
        /// Editor command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The editor exited in a way that counts as failure.
    #[error("editor ({command}) failed: {status}")]
    Status {
        /// Editor command line.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
}

/// Opens the staged file for interactive editing.
pub trait Editor {
    /// Edits `staged` in place, positioning the cursor at `line` when the
    /// editor supports it. Blocks until the editor exits.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError`] when the editor cannot be run or fails.
    fn edit(&self, staged: &Path, line: Option<u32>) -> Result<(), EditorError>;
}

/// Runs an external editor as `<program> <args> [+N] <staged>`.
#[derive(Debug, Clone)]
pub struct ProcessEditor {
    command: CommandLine,
}

impl ProcessEditor {
    /// Wraps a resolved editor command line.
    #[must_use]
    pub const fn new(command: CommandLine) -> Self {
        Self { command }
    }

    /// The command line that will be run.
    #[must_use]
    pub const fn command(&self) -> &CommandLine {
        &self.command
    }
}

impl Editor for ProcessEditor {
    fn edit(&self, staged: &Path, line: Option<u32>) -> Result<(), EditorError> {
        let mut command = command_for(&self.command);
        if let Some(line) = line {
            command.arg(format!("+{line}"));
        }
        command.arg(staged);

        debug!(
            target: EDITOR_TARGET,
            editor = %self.command,
            path = %staged.display(),
            line,
            "launching editor"
        );
        let status = command.status().map_err(|source| EditorError::Launch {
            command: self.command.to_string(),
            source,
        })?;

        if accepts(status) {
            debug!(target: EDITOR_TARGET, %status, "editor finished");
            Ok(())
        } else {
            Err(EditorError::Status {
                command: self.command.to_string(),
                status,
            })
        }
    }
}

/// Editors such as vi exit with 1 after an ordinary session; only larger
/// codes and death by signal count as failure.
fn accepts(status: ExitStatus) -> bool {
    matches!(status.code(), Some(0 | 1))
}
