//! Error types for the CLI runtime.

use std::sync::Arc;

use thiserror::Error;
use vigil_core::{IdentityError, SessionError};

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    UnknownUser(#[from] IdentityError),
    #[error("{0}")]
    Session(#[from] SessionError),
}

impl AppError {
    /// Returns true when the error may leave the operator unsure whether
    /// the target was touched, so the diagnostic must say it was not.
    pub(crate) const fn needs_unchanged_notice(&self) -> bool {
        match self {
            Self::Session(error) => !error.is_busy(),
            Self::Telemetry(_) | Self::UnknownUser(_) => true,
            Self::LoadConfiguration(_) | Self::CliUsage(_) => false,
        }
    }
}
