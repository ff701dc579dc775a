//! CLI argument definitions for vigil.
//!
//! Shared by the runtime parser and the build script that renders the
//! manual page. Configuration flags are split off before this parser runs.

use clap::Parser;

/// Edit the protected configuration file safely.
///
/// The target is copied to a staging file, opened in `$EDITOR` (or
/// `$VISUAL`), checked by the configured validator, and only then renamed
/// into place. Configuration flags such as `--target-path`, `--editor` and
/// `--validator` may precede the options below.
#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    disable_help_flag = true,
    disable_version_flag = true,
    override_usage = "vigil [-V]"
)]
pub(crate) struct Cli {
    /// Prints the version and exits.
    #[arg(short = 'V')]
    pub(crate) version: bool,
}
