//! Authentication error types

use thiserror::Error;

/// Result type for credential and signing operations
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Unsupported resource principal version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid security token: {0}")]
    InvalidToken(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AuthError> for urlcast_core::Error {
    fn from(err: AuthError) -> Self {
        urlcast_core::Error::Auth(err.to_string())
    }
}
