//! Error taxonomy for an editing session.
//!
//! Every variant except [`SessionError::Busy`] is raised after the staging
//! slot was created, so the session removes the slot before surfacing it.
//! Validation failures are not errors: they are
//! [`ValidationOutcome`](crate::ValidationOutcome) values resolved by the
//! operator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::commit::CommitError;
use crate::editor::EditorError;
use crate::signals::SignalError;
use crate::slot::SlotError;
use crate::validator::ValidatorError;

/// Fatal failures that end a session with the target left unchanged.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Another session holds the staging slot.
    #[error("'{path}' busy, try again later")]
    Busy {
        /// Staging path that already exists.
        path: PathBuf,
    },
    /// The staging slot could not be created.
    #[error("failed to create staging file '{path}': {source}")]
    CreateStaging {
        /// Staging path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Cleanup handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] SignalError),
    /// The target exists but could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadTarget {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the working copy into the staging slot failed.
    #[error("write to staging file '{path}' failed: {source}")]
    WriteStaging {
        /// Staging path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A write accepted fewer bytes than were read from the target.
    #[error("short write to staging file '{path}': {written} of {expected} bytes")]
    ShortWrite {
        /// Staging path.
        path: PathBuf,
        /// Bytes read from the target.
        expected: usize,
        /// Bytes the staging file accepted.
        written: usize,
    },
    /// The staged file vanished or could not be inspected after editing.
    #[error("can't stat temporary file '{path}': {source}")]
    StatStaging {
        /// Staging path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The editor left an empty staged file.
    #[error("zero length temporary file '{path}'")]
    EmptyStaging {
        /// Staging path.
        path: PathBuf,
    },
    /// The editor could not be run or reported failure.
    #[error(transparent)]
    Editor(#[from] EditorError),
    /// The validator could not be run.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
    /// The operator's answer could not be read.
    #[error("failed to read operator response: {source}")]
    Prompt {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Applying final attributes or replacing the target failed.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl SessionError {
    /// Returns true when the session never owned the staging slot.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

impl From<SlotError> for SessionError {
    fn from(error: SlotError) -> Self {
        match error {
            SlotError::Busy { path } => Self::Busy { path },
            SlotError::Create { path, source } => Self::CreateStaging { path, source },
        }
    }
}
