//! Error types for the CLI

use std::path::PathBuf;

use orgmove_common::telemetry::TelemetryError;
use orgmove_common::PlacementError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Placement(#[from] PlacementError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("invalid organization file {path}: {message}")]
    InvalidOrganization { path: PathBuf, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
