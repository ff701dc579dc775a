//! Populating the staging slot from the current target.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::SessionError;

const WORKING_COPY_TARGET: &str = "vigil::working_copy";

const COPY_BUFFER_LEN: usize = 8 * 1024;

/// What was copied into the staging slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingCopy {
    /// Whether the target existed. A missing target yields an empty copy.
    pub existed: bool,
    /// Bytes copied.
    pub bytes: u64,
}

/// Copies `target` into the already-open `staged` file.
///
/// # Errors
///
/// Fails with [`SessionError::ReadTarget`] when the target exists but cannot
/// be read, [`SessionError::WriteStaging`] when a write errors, and
/// [`SessionError::ShortWrite`] when a single write accepts fewer bytes than
/// were read.
pub(crate) fn populate(
    target: &Path,
    staged_path: &Path,
    staged: &mut File,
) -> Result<WorkingCopy, SessionError> {
    let read_error = |source| SessionError::ReadTarget {
        path: target.to_path_buf(),
        source,
    };
    let mut source = match File::open(target) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(
                target: WORKING_COPY_TARGET,
                path = %target.display(),
                "target absent; starting from an empty file"
            );
            return Ok(WorkingCopy {
                existed: false,
                bytes: 0,
            });
        }
        Err(error) => return Err(read_error(error)),
    };

    let mut buffer = [0_u8; COPY_BUFFER_LEN];
    let mut bytes = 0_u64;
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(read_error(error)),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        let written = write_once(staged, chunk).map_err(|source| SessionError::WriteStaging {
            path: staged_path.to_path_buf(),
            source,
        })?;
        if written != read {
            return Err(SessionError::ShortWrite {
                path: staged_path.to_path_buf(),
                expected: read,
                written,
            });
        }
        bytes += read as u64;
    }

    debug!(
        target: WORKING_COPY_TARGET,
        path = %target.display(),
        bytes,
        "working copy populated"
    );
    Ok(WorkingCopy {
        existed: true,
        bytes,
    })
}

fn write_once(staged: &mut File, chunk: &[u8]) -> io::Result<usize> {
    loop {
        match staged.write(chunk) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}
