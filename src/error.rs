// Keychain Store — Top-level error types
//
// Aggregates keychain failures and the I/O and serialization errors of the
// command-line front end into a single error enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Keychain error: {0}")]
    Keychain(#[from] crate::keychain::KeychainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
