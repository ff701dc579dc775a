//! Operator-facing session messages.
//!
//! Every event is logged through [`StructuredSessionReporter`]; the events
//! an operator has to act on are also written to stderr in plain text.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;

use vigil_core::{
    CommitMethod, SessionError, SessionReporter, StructuredSessionReporter, ValidationOutcome,
    ValidationReport, WorkingCopy,
};

pub(crate) struct TerminalReporter<'a, E: Write> {
    stderr: RefCell<&'a mut E>,
    structured: StructuredSessionReporter,
}

impl<'a, E: Write> TerminalReporter<'a, E> {
    pub(crate) fn new(stderr: &'a mut E) -> Self {
        Self {
            stderr: RefCell::new(stderr),
            structured: StructuredSessionReporter::new(),
        }
    }

    fn say(&self, message: &str) {
        let mut stderr = self.stderr.borrow_mut();
        if let Err(error) = writeln!(stderr, "vigil: {message}").and_then(|()| stderr.flush()) {
            tracing::debug!(target: "vigil::cli", %error, "failed to write operator message");
        }
    }
}

impl<E: Write> SessionReporter for TerminalReporter<'_, E> {
    fn session_started(&self, target: &Path, staged: &Path, operator: Option<&str>) {
        self.structured.session_started(target, staged, operator);
    }

    fn working_copy_ready(&self, target: &Path, copy: &WorkingCopy) {
        self.structured.working_copy_ready(target, copy);
    }

    fn editor_launching(&self, staged: &Path, line: Option<u32>) {
        self.structured.editor_launching(staged, line);
    }

    fn validation_failed(&self, staged: &Path, report: &ValidationReport) {
        self.structured.validation_failed(staged, report);
        for line in report.diagnostics.lines() {
            self.say(line);
        }
        match report.outcome {
            ValidationOutcome::ErrorAtLine(line) => {
                self.say(&format!("parse error in {} near line {line}", staged.display()));
            }
            ValidationOutcome::ErrorUnknown | ValidationOutcome::Clean => {
                self.say(&format!("failed to parse {}", staged.display()));
            }
        }
    }

    fn force_commit_chosen(&self, target: &Path) {
        self.structured.force_commit_chosen(target);
    }

    fn discarded(&self, target: &Path) {
        self.structured.discarded(target);
    }

    fn committed(&self, target: &Path, staged: &Path, method: CommitMethod) {
        self.structured.committed(target, staged, method);
        if method == CommitMethod::CopiedAcrossDevices {
            self.say(&format!(
                "{} and {} not on the same filesystem, copied instead of renamed",
                staged.display(),
                target.display()
            ));
        }
    }

    fn staging_left_behind(&self, staged: &Path, error: &io::Error) {
        self.structured.staging_left_behind(staged, error);
        self.say(&format!(
            "unable to remove {}: {error}; delete it by hand or later edits will report the file as busy",
            staged.display()
        ));
    }

    fn aborted(&self, target: &Path, error: &SessionError) {
        self.structured.aborted(target, error);
    }
}
