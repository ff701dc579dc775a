//! Command-line runtime for vigil.
//!
//! The runner splits leading configuration flags from vigil's own options,
//! loads layered configuration, and drives one editing session against the
//! operator's terminal. IO streams and the configuration loader are
//! injectable so the runtime can be exercised from tests.

use std::env;
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use camino::Utf8Path;
use clap::Parser;
use tracing::warn;
use vigil_config::Config;
use vigil_core::{
    AcceptingValidator, CommandValidator, InvokingUser, ProcessEditor, Prompt, Session,
    SessionOutcome, SessionSettings, Validator,
};

mod cli;
mod config;
mod errors;
mod reporter;
mod telemetry;

use cli::Cli;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::{prepare_cli_arguments, split_config_arguments};
pub(crate) use errors::AppError;
use reporter::TerminalReporter;

const USAGE: &str = "usage: vigil [-V]";
const CLI_TARGET: &str = "vigil::cli";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: BufRead, W: Write, E: Write> {
    pub(crate) stdin: R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, R: BufRead, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) fn new(stdin: R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

struct CliRunner<'a, 'io, R: BufRead, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, R, W, E>,
    loader: &'a L,
}

impl<'a, 'io, R, W, E, L> CliRunner<'a, 'io, R, W, E, L>
where
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'io, R, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.fail(&AppError::CliUsage(error), None),
        };
        if cli.version {
            let version = format!("vigil version {}", env!("CARGO_PKG_VERSION"));
            write_line(self.io.stdout, &version);
            return ExitCode::SUCCESS;
        }

        let config = match self.loader.load(&split.config_arguments) {
            Ok(config) => config,
            Err(error) => return self.fail(&error, None),
        };
        match self.edit(&config) {
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => self.fail(&error, Some(config.target_path().as_path())),
        }
    }

    fn edit(&mut self, config: &Config) -> Result<SessionOutcome, AppError> {
        telemetry::install(config)?;
        let user = InvokingUser::current()?;

        let editor = ProcessEditor::new(config.editor_command(|name| env::var(name).ok()));
        let validator: Box<dyn Validator> = match config.validator_command() {
            Some(command) => Box::new(CommandValidator::new(command)),
            None => {
                warn!(
                    target: CLI_TARGET,
                    path = %config.target_path(),
                    "no validator configured; every edit will be accepted"
                );
                Box::new(AcceptingValidator)
            }
        };
        let subject = config
            .target_path()
            .file_name()
            .unwrap_or_else(|| config.target_path().as_str())
            .to_owned();
        let settings = SessionSettings::from_config(config).with_operator(user.name);

        let io = &mut *self.io;
        let mut prompt = Prompt::new(&mut io.stdin, &mut *io.stdout, subject)
            .allow_force_commit(config.allow_force_commit);
        let reporter = TerminalReporter::new(&mut *io.stderr);
        let outcome = Session::new(settings, &editor, validator.as_ref(), &mut prompt)
            .with_reporter(&reporter)
            .run()?;
        Ok(outcome)
    }

    fn fail(&mut self, error: &AppError, target: Option<&Utf8Path>) -> ExitCode {
        match error {
            AppError::CliUsage(_) => write_line(self.io.stderr, USAGE),
            _ => {
                write_line(self.io.stderr, &format!("vigil: {error}"));
                if let Some(target) = target.filter(|_| error.needs_unchanged_notice()) {
                    write_line(self.io.stderr, &format!("vigil: {target} unchanged"));
                }
            }
        }
        ExitCode::FAILURE
    }
}

fn write_line<S: Write>(stream: &mut S, line: &str) {
    if let Err(error) = writeln!(stream, "{line}").and_then(|()| stream.flush()) {
        tracing::debug!(target: CLI_TARGET, %error, "failed to write to terminal");
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, R, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

#[cfg(test)]
mod tests;
