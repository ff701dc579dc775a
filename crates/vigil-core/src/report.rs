//! Session lifecycle events for telemetry and operator-facing sinks.

use std::io;
use std::path::Path;

use crate::commit::CommitMethod;
use crate::error::SessionError;
use crate::validator::ValidationReport;
use crate::working_copy::WorkingCopy;

const SESSION_TARGET: &str = "vigil::session";

/// Observer notified as a session moves through its states.
pub trait SessionReporter {
    /// The staging slot is held and cleanup handlers are armed.
    fn session_started(&self, target: &Path, staged: &Path, operator: Option<&str>);

    /// The staging slot holds a copy of the target.
    fn working_copy_ready(&self, target: &Path, copy: &WorkingCopy);

    /// The editor is about to run, optionally positioned at `line`.
    fn editor_launching(&self, staged: &Path, line: Option<u32>);

    /// The validator rejected the staged content.
    fn validation_failed(&self, staged: &Path, report: &ValidationReport);

    /// The operator chose to commit rejected content.
    fn force_commit_chosen(&self, target: &Path);

    /// The operator discarded the staged changes.
    fn discarded(&self, target: &Path);

    /// The staged content replaced the target.
    fn committed(&self, target: &Path, staged: &Path, method: CommitMethod);

    /// The target was committed but the staged file could not be removed,
    /// so later sessions will find the slot busy until it is deleted.
    fn staging_left_behind(&self, staged: &Path, error: &io::Error);

    /// The session ended with a fatal error.
    fn aborted(&self, target: &Path, error: &SessionError);
}

/// Default reporter that records session events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredSessionReporter;

impl StructuredSessionReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionReporter for StructuredSessionReporter {
    fn session_started(&self, target: &Path, staged: &Path, operator: Option<&str>) {
        tracing::info!(
            target: SESSION_TARGET,
            event = "session_started",
            path = %target.display(),
            staged = %staged.display(),
            operator,
            "editing session started"
        );
    }

    fn working_copy_ready(&self, target: &Path, copy: &WorkingCopy) {
        tracing::debug!(
            target: SESSION_TARGET,
            event = "working_copy_ready",
            path = %target.display(),
            existed = copy.existed,
            bytes = copy.bytes,
            "working copy ready"
        );
    }

    fn editor_launching(&self, staged: &Path, line: Option<u32>) {
        tracing::debug!(
            target: SESSION_TARGET,
            event = "editor_launching",
            staged = %staged.display(),
            line,
            "opening editor"
        );
    }

    fn validation_failed(&self, staged: &Path, report: &ValidationReport) {
        tracing::warn!(
            target: SESSION_TARGET,
            event = "validation_failed",
            staged = %staged.display(),
            line = report.outcome.line(),
            diagnostics = %report.diagnostics,
            "staged content rejected"
        );
    }

    fn force_commit_chosen(&self, target: &Path) {
        tracing::warn!(
            target: SESSION_TARGET,
            event = "force_commit",
            path = %target.display(),
            "committing content that failed validation"
        );
    }

    fn discarded(&self, target: &Path) {
        tracing::info!(
            target: SESSION_TARGET,
            event = "discarded",
            path = %target.display(),
            "changes discarded"
        );
    }

    fn committed(&self, target: &Path, staged: &Path, method: CommitMethod) {
        tracing::info!(
            target: SESSION_TARGET,
            event = "committed",
            path = %target.display(),
            staged = %staged.display(),
            method = ?method,
            "changes committed"
        );
    }

    fn staging_left_behind(&self, staged: &Path, error: &io::Error) {
        tracing::error!(
            target: SESSION_TARGET,
            event = "staging_left_behind",
            staged = %staged.display(),
            error = %error,
            "staging file survived the commit"
        );
    }

    fn aborted(&self, target: &Path, error: &SessionError) {
        tracing::error!(
            target: SESSION_TARGET,
            event = "aborted",
            path = %target.display(),
            error = %error,
            "session aborted"
        );
    }
}
