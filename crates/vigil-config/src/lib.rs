//! Shared configuration for the vigil safe editor.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then any
//! discovered configuration file, then `VIGIL_*` environment variables, and
//! finally command-line flags. The resolved [`Config`] names the protected
//! target file, the well-known staging slot, the editor and validator command
//! lines, and the ownership and permission bits applied at commit time.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod command;
mod defaults;
mod logging;
mod mode;

pub use command::{CommandLine, EDITOR_ENV_VARS};
pub use defaults::{
    DEFAULT_EDITOR, DEFAULT_GROUP, DEFAULT_LOG_FILTER, DEFAULT_MODE, DEFAULT_OWNER,
    DEFAULT_STAGING_PATH, DEFAULT_TARGET_PATH, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use mode::{FileMode, FileModeParseError};

/// Resolved configuration for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "VIGIL")]
pub struct Config {
    /// The protected file that is only ever replaced by an atomic commit.
    #[serde(default = "defaults::target_path")]
    pub target_path: Utf8PathBuf,
    /// Well-known staging location; its existence is the session lock.
    #[serde(default = "defaults::staging_path")]
    pub staging_path: Utf8PathBuf,
    /// Explicit editor command line. Takes precedence over the environment.
    #[serde(default)]
    pub editor: Option<String>,
    /// Whether `EDITOR` and `VISUAL` are consulted when no editor is set.
    #[serde(default = "defaults::enabled")]
    pub env_editor: bool,
    /// Validator command line. The staged path is appended as the last
    /// argument.
    #[serde(default)]
    pub validator: Option<String>,
    /// Numeric owner applied to the staged file before commit.
    #[serde(default = "defaults::owner")]
    pub owner: u32,
    /// Numeric group applied to the staged file before commit.
    #[serde(default = "defaults::group")]
    pub group: u32,
    /// Permission bits applied to the staged file before commit.
    #[serde(default = "defaults::mode")]
    pub mode: FileMode,
    /// Whether the operator may commit content the validator rejected.
    #[serde(default = "defaults::enabled")]
    pub allow_force_commit: bool,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log line format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_path: defaults::target_path(),
            staging_path: defaults::staging_path(),
            editor: None,
            env_editor: true,
            validator: None,
            owner: DEFAULT_OWNER,
            group: DEFAULT_GROUP,
            mode: DEFAULT_MODE,
            allow_force_commit: true,
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path of the protected target file.
    #[must_use]
    pub fn target_path(&self) -> &Utf8PathBuf {
        &self.target_path
    }

    /// Path of the staging slot.
    #[must_use]
    pub fn staging_path(&self) -> &Utf8PathBuf {
        &self.staging_path
    }

    /// Log filter expression handed to the telemetry layer.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Requested log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Resolves the editor command line.
    ///
    /// An explicit `editor` setting wins. Otherwise, when `env_editor` is
    /// enabled, the first non-blank value among [`EDITOR_ENV_VARS`] is used,
    /// falling back to [`DEFAULT_EDITOR`].
    pub fn editor_command<F>(&self, lookup: F) -> CommandLine
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = self.editor.as_deref().and_then(CommandLine::parse);
        if let Some(command) = configured {
            return command;
        }

        if self.env_editor {
            let from_env = EDITOR_ENV_VARS
                .iter()
                .filter_map(|name| lookup(name))
                .find_map(|value| CommandLine::parse(&value));
            if let Some(command) = from_env {
                return command;
            }
        }

        CommandLine::bare(DEFAULT_EDITOR)
    }

    /// Parses the configured validator command line, if any.
    #[must_use]
    pub fn validator_command(&self) -> Option<CommandLine> {
        self.validator.as_deref().and_then(CommandLine::parse)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_describe_a_sudoers_style_layout() {
        let config = Config::default();
        assert_eq!(config.target_path().as_str(), DEFAULT_TARGET_PATH);
        assert_eq!(config.staging_path().as_str(), DEFAULT_STAGING_PATH);
        assert_eq!(config.mode, FileMode::new(0o440));
        assert_eq!(config.owner, 0);
        assert!(config.allow_force_commit);
        assert_eq!(config.log_format(), LogFormat::Compact);
    }

    #[rstest]
    #[case::explicit_wins(Some("nano -w"), true, &[("EDITOR", "emacs")], "nano", &["-w"])]
    #[case::editor_env(None, true, &[("EDITOR", "emacs -nw"), ("VISUAL", "code")], "emacs", &["-nw"])]
    #[case::visual_env(None, true, &[("VISUAL", "code --wait")], "code", &["--wait"])]
    #[case::blank_env_skipped(None, true, &[("EDITOR", "  "), ("VISUAL", "ed")], "ed", &[])]
    #[case::env_disabled(None, false, &[("EDITOR", "emacs")], DEFAULT_EDITOR, &[])]
    #[case::fallback(None, true, &[], DEFAULT_EDITOR, &[])]
    fn resolves_editor_preference(
        #[case] configured: Option<&str>,
        #[case] env_editor: bool,
        #[case] env: &[(&str, &str)],
        #[case] program: &str,
        #[case] args: &[&str],
    ) {
        let config = Config {
            editor: configured.map(str::to_owned),
            env_editor,
            ..Config::default()
        };
        let command = config.editor_command(env_of(env));
        assert_eq!(command.program(), program);
        assert_eq!(command.args(), args);
    }

    #[test]
    fn blank_validator_is_treated_as_unset() {
        let config = Config {
            validator: Some(String::from("   ")),
            ..Config::default()
        };
        assert!(config.validator_command().is_none());
    }
}
