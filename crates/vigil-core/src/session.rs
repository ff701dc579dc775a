//! The edit, validate and commit cycle for one protected file.
//!
//! A [`Session`] owns every piece of mutable state for a run: the staging
//! slot, the signal guard, and the current [`SessionState`]. Control flows
//! acquire, arm, populate, edit and validate until resolved, then either
//! finalize and commit or discard. Every exit path after acquisition
//! removes the staged file exactly once.

use std::path::{Path, PathBuf};
use std::{fs, io};

use vigil_config::Config;

use crate::commit::{self, CommitMethod, FinalAttributes};
use crate::editor::Editor;
use crate::error::SessionError;
use crate::prompt::{Choice, Operator};
use crate::report::{SessionReporter, StructuredSessionReporter};
use crate::signals::SignalGuard;
use crate::slot::{SlotHandle, StagingSlot};
use crate::validator::Validator;
use crate::working_copy::populate;

static STRUCTURED_REPORTER: StructuredSessionReporter = StructuredSessionReporter::new();

/// Where the edit loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The editor is about to run, positioned at `line` if known.
    Editing {
        /// Line to open the editor at.
        line: Option<u32>,
    },
    /// The staged file is about to be checked.
    Validating,
    /// The validator rejected the content; the operator decides next.
    ParseError {
        /// Line the validator reported, if any.
        line: Option<u32>,
    },
    /// Terminal: the staged content will be committed.
    Clean,
    /// Terminal: the staged content will be discarded.
    Aborted,
}

/// How a successful session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The target now holds the staged content.
    Committed(CommitMethod),
    /// The operator discarded the changes; the target is unchanged.
    Discarded,
}

/// Paths and policies for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// The protected file.
    pub target: PathBuf,
    /// The staging slot.
    pub staging: PathBuf,
    /// Ownership and mode applied at commit.
    pub attributes: FinalAttributes,
    /// Whether fatal signals are trapped to remove the staged file.
    pub trap_signals: bool,
    /// Login name of the invoking user, for the session log.
    pub operator: Option<String>,
}

impl SessionSettings {
    /// Derives settings from resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.target_path().clone().into_std_path_buf(),
            staging: config.staging_path().clone().into_std_path_buf(),
            attributes: FinalAttributes::from_config(config),
            trap_signals: true,
            operator: None,
        }
    }

    /// Records the invoking user's login name.
    #[must_use]
    pub fn with_operator(mut self, name: impl Into<String>) -> Self {
        self.operator = Some(name.into());
        self
    }
}

/// One run of the safe-edit cycle.
pub struct Session<'a> {
    settings: SessionSettings,
    editor: &'a dyn Editor,
    validator: &'a dyn Validator,
    operator: &'a mut dyn Operator,
    reporter: &'a dyn SessionReporter,
    state: SessionState,
}

impl<'a> Session<'a> {
    /// Wires a session to its collaborators. Events go to
    /// [`StructuredSessionReporter`] unless replaced.
    pub fn new(
        settings: SessionSettings,
        editor: &'a dyn Editor,
        validator: &'a dyn Validator,
        operator: &'a mut dyn Operator,
    ) -> Self {
        Self {
            settings,
            editor,
            validator,
            operator,
            reporter: &STRUCTURED_REPORTER,
            state: SessionState::Editing { line: None },
        }
    }

    /// Sends lifecycle events to `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: &'a dyn SessionReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] without touching anything when another
    /// session holds the slot. Every other error is returned after the
    /// staged file has been removed; the target is unchanged in all error
    /// cases.
    pub fn run(mut self) -> Result<SessionOutcome, SessionError> {
        let result = self.execute();
        if let Err(error) = &result {
            self.reporter.aborted(&self.settings.target, error);
        }
        result
    }

    fn execute(&mut self) -> Result<SessionOutcome, SessionError> {
        let mut slot = StagingSlot::new(&self.settings.staging).acquire()?;
        let guard = if self.settings.trap_signals {
            Some(SignalGuard::install(slot.path())?)
        } else {
            None
        };
        self.reporter.session_started(
            &self.settings.target,
            slot.path(),
            self.settings.operator.as_deref(),
        );

        match self.edit_until_resolved(&mut slot) {
            Ok(SessionState::Clean) => self.commit(slot, guard),
            Ok(_) => {
                finish(guard, || slot.release());
                self.reporter.discarded(&self.settings.target);
                Ok(SessionOutcome::Discarded)
            }
            Err(error) => {
                finish(guard, || slot.release());
                Err(error)
            }
        }
    }

    fn edit_until_resolved(&mut self, slot: &mut SlotHandle) -> Result<SessionState, SessionError> {
        self.prepare(slot)?;
        self.drive(slot.path())
    }

    fn prepare(&self, slot: &mut SlotHandle) -> Result<(), SessionError> {
        let staged = slot.path().to_path_buf();
        let write_error = |source| SessionError::WriteStaging {
            path: staged.clone(),
            source,
        };
        let file = slot.file_mut().map_err(write_error)?;
        let copy = populate(&self.settings.target, &staged, file)?;
        slot.seal().map_err(write_error)?;
        self.reporter.working_copy_ready(&self.settings.target, &copy);
        Ok(())
    }

    /// Steps the state machine until it reaches `Clean` or `Aborted`.
    fn drive(&mut self, staged: &Path) -> Result<SessionState, SessionError> {
        loop {
            self.state = match self.state {
                SessionState::Editing { line } => {
                    self.reporter.editor_launching(staged, line);
                    self.editor.edit(staged, line)?;
                    SessionState::Validating
                }
                SessionState::Validating => {
                    inspect_staged(staged)?;
                    let report = self.validator.validate(staged)?;
                    if report.outcome.is_clean() {
                        SessionState::Clean
                    } else {
                        self.reporter.validation_failed(staged, &report);
                        SessionState::ParseError {
                            line: report.outcome.line(),
                        }
                    }
                }
                SessionState::ParseError { line } => {
                    let choice = self
                        .operator
                        .choose()
                        .map_err(|source| SessionError::Prompt { source })?;
                    match choice {
                        Choice::Edit => SessionState::Editing { line },
                        Choice::Exit => SessionState::Aborted,
                        Choice::ForceCommit => {
                            self.reporter.force_commit_chosen(&self.settings.target);
                            SessionState::Clean
                        }
                    }
                }
                terminal @ (SessionState::Clean | SessionState::Aborted) => return Ok(terminal),
            };
        }
    }

    fn commit(
        &self,
        slot: SlotHandle,
        guard: Option<SignalGuard>,
    ) -> Result<SessionOutcome, SessionError> {
        let staged = slot.path().to_path_buf();
        if let Err(error) = commit::finalize(&staged, &self.settings.attributes) {
            finish(guard, || slot.release());
            return Err(error.into());
        }

        let target = &self.settings.target;
        let (method, leftover) = finish(guard, || match commit::commit(&staged, target) {
            Ok(method) => Ok((method, settle(slot, method))),
            Err(error) => {
                slot.release();
                Err(error)
            }
        })?;
        if let Some(error) = leftover {
            self.reporter.staging_left_behind(&staged, &error);
        }
        self.reporter.committed(target, &staged, method);
        Ok(SessionOutcome::Committed(method))
    }
}

/// Runs the last filesystem step of a session with the guard disarming
/// around it, or directly when signals are not trapped.
fn finish<T>(guard: Option<SignalGuard>, step: impl FnOnce() -> T) -> T {
    match guard {
        Some(guard) => guard.disarm_with(step),
        None => step(),
    }
}

/// Accounts for the staged file once the target holds its content: a rename
/// already moved it, a cross-device copy leaves it to be unlinked.
fn settle(slot: SlotHandle, method: CommitMethod) -> Option<io::Error> {
    match method {
        CommitMethod::Renamed => {
            slot.consume();
            None
        }
        CommitMethod::CopiedAcrossDevices => slot.remove().err(),
    }
}

fn inspect_staged(staged: &Path) -> Result<(), SessionError> {
    let metadata = fs::metadata(staged).map_err(|source| SessionError::StatStaging {
        path: staged.to_path_buf(),
        source,
    })?;
    if metadata.len() == 0 {
        return Err(SessionError::EmptyStaging {
            path: staged.to_path_buf(),
        });
    }
    Ok(())
}
