use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::mode::FileMode;

/// Default protected target file.
pub const DEFAULT_TARGET_PATH: &str = "/etc/sudoers";

/// Default staging slot. Kept beside the target so commits are a plain rename.
pub const DEFAULT_STAGING_PATH: &str = "/etc/sudoers.tmp";

/// Editor used when neither configuration nor the environment names one.
pub const DEFAULT_EDITOR: &str = "/usr/bin/vi";

/// Default owner of the committed file.
pub const DEFAULT_OWNER: u32 = 0;

/// Default group of the committed file.
pub const DEFAULT_GROUP: u32 = 0;

/// Default permission bits of the committed file.
pub const DEFAULT_MODE: FileMode = FileMode::new(0o440);

/// Default log filter expression. Interactive sessions stay quiet unless
/// something goes wrong.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binary.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

pub(crate) fn target_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_TARGET_PATH)
}

pub(crate) fn staging_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STAGING_PATH)
}

pub(crate) const fn owner() -> u32 {
    DEFAULT_OWNER
}

pub(crate) const fn group() -> u32 {
    DEFAULT_GROUP
}

pub(crate) const fn mode() -> FileMode {
    DEFAULT_MODE
}

pub(crate) const fn enabled() -> bool {
    true
}
