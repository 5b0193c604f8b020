use std::result::Result as StdResult;

use backoffice_config::ConfigError;
use backoffice_core::CoreError;
use thiserror::Error;

/// Unified error type for the service, storage and config layers.
#[derive(Error, Debug)]
pub enum BackOfficeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Integrity violation: {0}")]
    Integrity(String),
    #[error("Code allocation failed: {0}")]
    Allocation(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = StdResult<T, BackOfficeError>;

impl BackOfficeError {
    /// Whether the operator can fix the failure by changing the command.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BackOfficeError::InvalidInput(_)
                | BackOfficeError::NotFound { .. }
                | BackOfficeError::Conflict(_)
                | BackOfficeError::Integrity(_)
        )
    }
}

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] BackOfficeError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
    #[error("Line editor failed: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("Prompt failed: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

impl From<CoreError> for BackOfficeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => BackOfficeError::InvalidInput(message),
            CoreError::NotFound { entity, id } => BackOfficeError::NotFound { entity, id },
            CoreError::Conflict(message) => BackOfficeError::Conflict(message),
            CoreError::Integrity(message) => BackOfficeError::Integrity(message),
            err @ CoreError::ExhaustedRetries { .. } => {
                BackOfficeError::Allocation(err.to_string())
            }
            CoreError::TransientStore(message) | CoreError::Serde(message) => {
                BackOfficeError::StorageError(message)
            }
        }
    }
}

impl From<std::io::Error> for BackOfficeError {
    fn from(err: std::io::Error) -> Self {
        BackOfficeError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for BackOfficeError {
    fn from(err: serde_json::Error) -> Self {
        BackOfficeError::StorageError(err.to_string())
    }
}

impl From<ConfigError> for BackOfficeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => BackOfficeError::StorageError(io.to_string()),
            ConfigError::Serde(message) | ConfigError::Invalid(message) => {
                BackOfficeError::ConfigError(message)
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}
