// lib/src/errors.rs

use bincode::error::{DecodeError, EncodeError};
use models::errors::ValidationError;
use security::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Invalid input or data: {0}")]
    InvalidData(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Already Exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] DecodeError),
    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] EncodeError),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl From<anyhow::Error> for ClinicError {
    fn from(err: anyhow::Error) -> Self {
        ClinicError::ConfigurationError(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;
