//! Installing the validated staged file as the new target.
//!
//! Ownership and permission bits are applied to the staged file first, so
//! the target is never observed with the staging slot's private mode. The
//! replacement itself is a single `rename(2)`. When the staging slot and
//! the target live on different filesystems the content is copied into a
//! temporary file beside the target and that file is renamed instead; the
//! staged file is then left for the caller to remove.

use std::fs::{self, File, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::unistd::{Gid, Uid, chown};
use tempfile::Builder;
use thiserror::Error;
use tracing::{info, warn};
use vigil_config::{Config, FileMode};

const COMMIT_TARGET: &str = "vigil::commit";

/// Ownership and mode the committed file must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalAttributes {
    /// Numeric owner.
    pub owner: u32,
    /// Numeric group.
    pub group: u32,
    /// Permission bits.
    pub mode: FileMode,
}

impl FinalAttributes {
    /// Reads the attributes from resolved configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            owner: config.owner,
            group: config.group,
            mode: config.mode,
        }
    }
}

/// How the target was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMethod {
    /// The staged file was renamed over the target.
    Renamed,
    /// The filesystems differ; the content was copied and then renamed.
    CopiedAcrossDevices,
}

/// Errors raised while finalising or installing the staged file.
#[derive(Debug, Error)]
pub enum CommitError {
    /// `chown(2)` failed.
    #[error("unable to set (uid, gid) of '{path}' to ({owner}, {group}): {source}")]
    Ownership {
        /// Staged path.
        path: PathBuf,
        /// Requested owner.
        owner: u32,
        /// Requested group.
        group: u32,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// `chmod(2)` failed.
    #[error("unable to change mode of '{path}' to {mode}: {source}")]
    Mode {
        /// Staged path.
        path: PathBuf,
        /// Requested mode.
        mode: FileMode,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// `rename(2)` failed for a reason other than crossing filesystems.
    #[error("error renaming '{staged}' to '{target}': {source}")]
    Rename {
        /// Staged path.
        staged: PathBuf,
        /// Target path.
        target: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The cross-filesystem copy failed; the target is unchanged.
    #[error("unable to copy '{staged}' to '{target}' across filesystems: {source}")]
    CrossDeviceCopy {
        /// Staged path.
        staged: PathBuf,
        /// Target path.
        target: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Applies owner, group and mode to the staged file.
///
/// # Errors
///
/// Returns [`CommitError::Ownership`] or [`CommitError::Mode`].
pub fn finalize(staged: &Path, attributes: &FinalAttributes) -> Result<(), CommitError> {
    chown(
        staged,
        Some(Uid::from_raw(attributes.owner)),
        Some(Gid::from_raw(attributes.group)),
    )
    .map_err(|source| CommitError::Ownership {
        path: staged.to_path_buf(),
        owner: attributes.owner,
        group: attributes.group,
        source,
    })?;
    // chown may clear set-id bits, so the mode goes on last.
    fs::set_permissions(staged, Permissions::from_mode(attributes.mode.bits())).map_err(
        |source| CommitError::Mode {
            path: staged.to_path_buf(),
            mode: attributes.mode,
            source,
        },
    )
}

/// Atomically replaces `target` with `staged`.
///
/// # Errors
///
/// Returns [`CommitError::Rename`] or [`CommitError::CrossDeviceCopy`]; in
/// both cases the target is unchanged and the staged file is still present.
/// After [`CommitMethod::CopiedAcrossDevices`] the staged file also remains
/// and must be removed by the caller.
pub fn commit(staged: &Path, target: &Path) -> Result<CommitMethod, CommitError> {
    commit_with(staged, target, |from, to| fs::rename(from, to))
}

pub(crate) fn commit_with<F>(
    staged: &Path,
    target: &Path,
    rename: F,
) -> Result<CommitMethod, CommitError>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    match rename(staged, target) {
        Ok(()) => {
            info!(
                target: COMMIT_TARGET,
                path = %target.display(),
                "target replaced"
            );
            Ok(CommitMethod::Renamed)
        }
        Err(error) if error.raw_os_error() == Some(libc::EXDEV) => {
            warn!(
                target: COMMIT_TARGET,
                staged = %staged.display(),
                path = %target.display(),
                "staging file and target are on different filesystems; copying"
            );
            copy_across_devices(staged, target).map_err(|source| {
                CommitError::CrossDeviceCopy {
                    staged: staged.to_path_buf(),
                    target: target.to_path_buf(),
                    source,
                }
            })?;
            Ok(CommitMethod::CopiedAcrossDevices)
        }
        Err(source) => Err(CommitError::Rename {
            staged: staged.to_path_buf(),
            target: target.to_path_buf(),
            source,
        }),
    }
}

/// Copies `staged` into a sibling of `target`, carrying over its owner and
/// mode, and renames the sibling over `target`.
fn copy_across_devices(staged: &Path, target: &Path) -> io::Result<()> {
    let directory = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let metadata = fs::metadata(staged)?;

    let mut builder = Builder::new();
    builder
        .prefix(".vigil-")
        .permissions(Permissions::from_mode(0o600));
    let mut sibling = builder.tempfile_in(directory)?;

    let mut source = File::open(staged)?;
    io::copy(&mut source, sibling.as_file_mut())?;
    chown(
        sibling.path(),
        Some(Uid::from_raw(metadata.uid())),
        Some(Gid::from_raw(metadata.gid())),
    )?;
    fs::set_permissions(sibling.path(), metadata.permissions())?;
    sibling.as_file().sync_all()?;
    sibling.persist(target).map_err(|error| error.error)?;
    Ok(())
}
