//! BDD test world: a temporary target, its staging slot, scripted
//! collaborators and the result of one session run.

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::unistd::{getegid, geteuid};
use tempfile::TempDir;
use vigil_config::FileMode;

use crate::commit::FinalAttributes;
use crate::error::SessionError;
use crate::prompt::Choice;
use crate::session::{Session, SessionOutcome, SessionSettings};
use crate::test_doubles::{EditorStep, MarkerValidator, ScriptedEditor, ScriptedOperator};

use super::reporter::RecordingSessionReporter;

/// Marker the scenario validator rejects.
pub const INVALID_MARKER: &str = "INVALID";

/// Snapshot of the target taken before the run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TargetSnapshot {
    contents: Vec<u8>,
    mode: u32,
}

/// Scenario world shared across BDD steps.
pub struct SessionWorld {
    dir: TempDir,
    pub settings: SessionSettings,
    pub reporter: RecordingSessionReporter,
    steps: Vec<EditorStep>,
    choices: Vec<Choice>,
    before: Option<TargetSnapshot>,
    result: Option<Result<SessionOutcome, SessionError>>,
    editor_lines: Vec<Option<u32>>,
}

impl SessionWorld {
    /// Builds a world around an empty temporary directory.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let settings = SessionSettings {
            target: dir.path().join("protected.conf"),
            staging: dir.path().join("protected.conf.tmp"),
            attributes: FinalAttributes {
                owner: geteuid().as_raw(),
                group: getegid().as_raw(),
                mode: FileMode::new(0o440),
            },
            trap_signals: false,
            operator: Some(String::from("scenario")),
        };
        Self {
            dir,
            settings,
            reporter: RecordingSessionReporter::default(),
            steps: Vec::new(),
            choices: Vec::new(),
            before: None,
            result: None,
            editor_lines: Vec::new(),
        }
    }

    /// Writes the target with mode `0644`.
    pub fn write_target(&mut self, contents: &str) {
        fs::write(&self.settings.target, contents).expect("write target");
        fs::set_permissions(&self.settings.target, fs::Permissions::from_mode(0o644))
            .expect("chmod target");
    }

    /// Creates the staging slot as if another session held it.
    pub fn occupy_staging(&self, contents: &str) {
        fs::write(&self.settings.staging, contents).expect("write staging");
    }

    /// Queues one editor invocation.
    pub fn push_step(&mut self, step: EditorStep) {
        self.steps.push(step);
    }

    /// Queues one operator answer.
    pub fn push_choice(&mut self, choice: Choice) {
        self.choices.push(choice);
    }

    /// Runs the session once with the queued script.
    pub fn run(&mut self) {
        self.before = snapshot(&self.settings.target);
        let editor = ScriptedEditor::new(self.steps.drain(..));
        let validator = MarkerValidator::new(INVALID_MARKER);
        let mut operator = ScriptedOperator::new(self.choices.drain(..));

        let result = Session::new(self.settings.clone(), &editor, &validator, &mut operator)
            .with_reporter(&self.reporter)
            .run();
        self.editor_lines = editor.requested_lines();
        self.result = Some(result);
    }

    /// Outcome of the run.
    pub fn outcome(&self) -> Option<&Result<SessionOutcome, SessionError>> {
        self.result.as_ref()
    }

    /// Lines the editor was asked to open at, one per invocation.
    pub fn editor_lines(&self) -> &[Option<u32>] {
        &self.editor_lines
    }

    /// Current target contents as text.
    pub fn target_contents(&self) -> String {
        fs::read_to_string(&self.settings.target).expect("read target")
    }

    /// Current target permission bits.
    pub fn target_mode(&self) -> u32 {
        fs::metadata(&self.settings.target)
            .expect("target metadata")
            .permissions()
            .mode()
            & 0o7777
    }

    /// Returns true when the target matches its pre-run snapshot.
    pub fn target_unchanged(&self) -> bool {
        snapshot(&self.settings.target) == self.before
    }

    /// Path of the staging slot.
    pub fn staging(&self) -> &Path {
        &self.settings.staging
    }

    /// Directory holding the scenario files.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn snapshot(path: &Path) -> Option<TargetSnapshot> {
    let contents = fs::read(path).ok()?;
    let mode = fs::metadata(path).ok()?.permissions().mode() & 0o7777;
    Some(TargetSnapshot { contents, mode })
}

/// Builds a fresh scenario world.
pub fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}
