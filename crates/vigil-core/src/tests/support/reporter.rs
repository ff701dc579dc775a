//! Test double for [`SessionReporter`] that records events for assertions.

use std::cell::RefCell;
use std::io;
use std::path::Path;

use crate::commit::CommitMethod;
use crate::error::SessionError;
use crate::report::SessionReporter;
use crate::validator::ValidationReport;
use crate::working_copy::WorkingCopy;

/// Session events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    WorkingCopyReady { existed: bool },
    EditorLaunching(Option<u32>),
    ValidationFailed(Option<u32>),
    ForceCommit,
    Discarded,
    Committed(CommitMethod),
    StagingLeftBehind,
    Aborted(String),
}

/// Records session events for assertions.
#[derive(Debug, Default)]
pub struct RecordingSessionReporter {
    events: RefCell<Vec<SessionEvent>>,
}

impl RecordingSessionReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    fn record(&self, event: SessionEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl SessionReporter for RecordingSessionReporter {
    fn session_started(&self, _target: &Path, _staged: &Path, _operator: Option<&str>) {
        self.record(SessionEvent::Started);
    }

    fn working_copy_ready(&self, _target: &Path, copy: &WorkingCopy) {
        self.record(SessionEvent::WorkingCopyReady {
            existed: copy.existed,
        });
    }

    fn editor_launching(&self, _staged: &Path, line: Option<u32>) {
        self.record(SessionEvent::EditorLaunching(line));
    }

    fn validation_failed(&self, _staged: &Path, report: &ValidationReport) {
        self.record(SessionEvent::ValidationFailed(report.outcome.line()));
    }

    fn force_commit_chosen(&self, _target: &Path) {
        self.record(SessionEvent::ForceCommit);
    }

    fn discarded(&self, _target: &Path) {
        self.record(SessionEvent::Discarded);
    }

    fn committed(&self, _target: &Path, _staged: &Path, method: CommitMethod) {
        self.record(SessionEvent::Committed(method));
    }

    fn staging_left_behind(&self, _staged: &Path, _error: &io::Error) {
        self.record(SessionEvent::StagingLeftBehind);
    }

    fn aborted(&self, _target: &Path, error: &SessionError) {
        self.record(SessionEvent::Aborted(error.to_string()));
    }
}
