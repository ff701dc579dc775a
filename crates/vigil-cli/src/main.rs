//! CLI entrypoint for vigil.
//!
//! The binary delegates to [`vigil_cli::run`], which loads configuration and
//! runs one editing session on the operator's terminal.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdin: StdinLock<'static> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    vigil_cli::run(std::env::args_os(), stdin, &mut stdout, &mut stderr)
}
