//! Error types for urlcast

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Invocation errors
    #[error("Malformed event payload: {0}")]
    Decode(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Startup errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Decode(_) => "DecodeError",
            Error::Auth(_) => "AuthError",
            Error::Publish(e) => e.code(),
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::Config(_) => "ConfigError",
            Error::Internal(_) | Error::Io(_) | Error::Other(_) => "InternalError",
        }
    }
}

/// Coarse classification of a failed publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishErrorKind {
    Transport,
    Timeout,
    Auth,
    Service,
    MalformedResponse,
    PerRecord,
}

impl PublishErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishErrorKind::Transport => "Transport",
            PublishErrorKind::Timeout => "Timeout",
            PublishErrorKind::Auth => "Auth",
            PublishErrorKind::Service => "Service",
            PublishErrorKind::MalformedResponse => "MalformedResponse",
            PublishErrorKind::PerRecord => "PerRecord",
        }
    }
}

impl std::fmt::Display for PublishErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure side of a single publish attempt.
///
/// Everything that can go wrong between building the request and reading the
/// per-record entry lands here, so callers always get a typed outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("publish did not complete within {0:?}")]
    Timeout(Duration),

    #[error("request signing failed: {0}")]
    Auth(String),

    #[error("stream service returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected publish response: {0}")]
    MalformedResponse(String),

    #[error("record rejected ({code}): {message}")]
    PerRecord { code: String, message: String },
}

impl PublishError {
    pub fn kind(&self) -> PublishErrorKind {
        match self {
            PublishError::Transport(_) => PublishErrorKind::Transport,
            PublishError::Timeout(_) => PublishErrorKind::Timeout,
            PublishError::Auth(_) => PublishErrorKind::Auth,
            PublishError::Service { .. } => PublishErrorKind::Service,
            PublishError::MalformedResponse(_) => PublishErrorKind::MalformedResponse,
            PublishError::PerRecord { .. } => PublishErrorKind::PerRecord,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PublishError::PerRecord { .. } => "PerRecordError",
            _ => "PublishError",
        }
    }
}
