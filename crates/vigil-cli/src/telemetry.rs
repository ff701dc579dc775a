//! Diagnostic logging for the `vigil` process.
//!
//! Records go to stderr so they never interleave with the `What now?` prompt
//! on stdout. The subscriber is process-global, so only the first call in a
//! process installs one; later sessions in the same process reuse it.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt};
use vigil_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors raised while setting up diagnostic logging.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    #[error("invalid log filter `{filter}`: {source}")]
    Filter {
        filter: String,
        #[source]
        source: ParseError,
    },
    #[error("another tracing subscriber is already installed: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config` unless one is
/// already in place.
pub(crate) fn install(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let subscriber = subscriber_for(config)?;
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(())
        })
        .map(|_| ())
}

fn subscriber_for(config: &Config) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|source| {
        TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            source,
        }
    })?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
