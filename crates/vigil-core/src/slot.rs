//! The single well-known staging slot.
//!
//! The slot doubles as the session lock: it is created with
//! create-exclusive semantics, so its mere existence tells a second
//! invocation that an edit is in progress. There is no separate lock file.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

const SLOT_TARGET: &str = "vigil::slot";

/// Owner read/write only until the final attributes are applied.
const STAGING_MODE: u32 = 0o600;

/// Errors raised while acquiring the slot.
#[derive(Debug, Error)]
pub enum SlotError {
    /// The slot already exists, so another session is active.
    #[error("staging file '{path}' already exists")]
    Busy {
        /// Staging path.
        path: PathBuf,
    },
    /// Creating the slot failed for another reason.
    #[error("failed to create staging file '{path}': {source}")]
    Create {
        /// Staging path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Location of the staging slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSlot {
    path: PathBuf,
}

impl StagingSlot {
    /// Describes the slot at `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Staging path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when some session currently holds the slot.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    /// Creates the slot exclusively with mode `0600`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Busy`] when the path already exists (nothing was
    /// created, so there is nothing to clean up) and [`SlotError::Create`]
    /// for any other failure.
    pub fn acquire(&self) -> Result<SlotHandle, SlotError> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true).mode(STAGING_MODE);
        match options.open(&self.path) {
            Ok(file) => {
                info!(
                    target: SLOT_TARGET,
                    path = %self.path.display(),
                    "staging slot acquired"
                );
                Ok(SlotHandle {
                    path: self.path.clone(),
                    file: Some(file),
                    released: false,
                })
            }
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Err(SlotError::Busy {
                path: self.path.clone(),
            }),
            Err(source) => Err(SlotError::Create {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Ownership of an acquired slot.
///
/// Dropping the handle releases the slot, so every exit path that unwinds
/// through the session removes the staged file.
#[derive(Debug)]
pub struct SlotHandle {
    path: PathBuf,
    file: Option<File>,
    released: bool,
}

impl SlotHandle {
    /// Staging path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open descriptor used to populate the working copy, until sealed.
    pub(crate) fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("staging file already sealed"))
    }

    /// Flushes the populated content to disk and closes the descriptor so
    /// the editor works on the file by path alone.
    pub(crate) fn seal(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Unlinks the staged file if it is present. Idempotent; never fails.
    pub fn release(mut self) {
        self.unlink();
    }

    /// Unlinks the staged file after its content was copied elsewhere.
    ///
    /// Unlike [`SlotHandle::release`] the failure is returned, since the
    /// leftover file would block every later session.
    pub(crate) fn remove(mut self) -> io::Result<()> {
        self.released = true;
        self.file = None;
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }

    /// Records that a commit moved the staged file onto the target, so the
    /// path must not be unlinked again.
    pub(crate) fn consume(mut self) {
        self.file = None;
        self.released = true;
    }

    fn unlink(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.file = None;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(
                target: SLOT_TARGET,
                path = %self.path.display(),
                "staging slot released"
            ),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: SLOT_TARGET,
                path = %self.path.display(),
                %error,
                "failed to remove staging file"
            ),
        }
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        self.unlink();
    }
}
