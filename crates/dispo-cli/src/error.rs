use std::io;

use dispo_core::config::ConfigError;
use dispo_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] dispo_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("At least one --field NAME=VALUE is required")]
    EmptyFields,
    #[error("Seed file {path} is not a JSON list of dispositions: {reason}")]
    InvalidSeed { path: String, reason: String },
    #[error("Refusing to delete local dispositions without --yes")]
    ResetNotConfirmed,
    #[error("No remote endpoint is configured. Set DISPO_API_BASE_URL to fetch remote history.")]
    RemoteNotConfigured,
}
