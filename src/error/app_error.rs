use thiserror::Error;

use crate::config::ConfigError;
use crate::logger::LoggerError;

/// Errors surfaced by the CLI and HTTP layers
///
/// Job failures never show up here: they are isolated per job and reported
/// through the drain summary and logs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = error.field().unwrap_or("settings").to_string();
        AppError::Configuration {
            key,
            source: error.into(),
        }
    }
}

impl From<LoggerError> for AppError {
    fn from(error: LoggerError) -> Self {
        AppError::Configuration {
            key: "logger".to_string(),
            source: error.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Internal {
            source: error.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
