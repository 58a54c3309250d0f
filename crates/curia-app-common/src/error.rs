use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: String, available: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
