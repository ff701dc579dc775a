//! Child process construction shared by the editor and validator.

use std::os::unix::process::CommandExt;
use std::process::Command;

use vigil_config::CommandLine;

use crate::signals::restore_child_dispositions;

/// Builds a command for `line` without involving a shell.
///
/// The child starts with terminal signals at their default action even
/// though the session itself ignores them.
pub(crate) fn command_for(line: &CommandLine) -> Command {
    let mut command = Command::new(line.program());
    command.args(line.args());
    // SAFETY: the hook only calls sigaction(2), which is async-signal-safe.
    unsafe {
        command.pre_exec(restore_child_dispositions);
    }
    command
}
