//! Stream client error types

use std::time::Duration;

use thiserror::Error;
use urlcast_auth::AuthError;
use urlcast_core::PublishError;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service error {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StreamError {
    /// Classify a client error; `timeout` is the bound the client was built with
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            StreamError::Timeout(timeout)
        } else if err.is_decode() {
            StreamError::Decode(err.to_string())
        } else {
            StreamError::Transport(err.to_string())
        }
    }
}

impl From<StreamError> for PublishError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Auth(e) => PublishError::Auth(e.to_string()),
            StreamError::Transport(m) | StreamError::InvalidConfig(m) => PublishError::Transport(m),
            StreamError::Timeout(after) => PublishError::Timeout(after),
            StreamError::Service {
                status,
                code,
                message,
            } => PublishError::Service {
                status,
                code,
                message,
            },
            StreamError::Decode(m) => PublishError::MalformedResponse(m),
        }
    }
}

impl From<StreamError> for urlcast_core::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Auth(e) => e.into(),
            StreamError::InvalidConfig(m) => urlcast_core::Error::Config(m),
            other => urlcast_core::Error::Publish(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urlcast_core::PublishErrorKind;

    #[test]
    fn test_timeout_keeps_its_kind() {
        let err = PublishError::from(StreamError::Timeout(Duration::from_secs(3)));
        assert_eq!(err, PublishError::Timeout(Duration::from_secs(3)));
        assert_eq!(err.kind(), PublishErrorKind::Timeout);

        let core: urlcast_core::Error = StreamError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(
            core,
            urlcast_core::Error::Publish(PublishError::Timeout(_))
        ));
    }

    #[test]
    fn test_publish_error_kinds() {
        let kind = |e: StreamError| PublishError::from(e).kind();
        assert_eq!(kind(StreamError::Transport("reset".into())), PublishErrorKind::Transport);
        assert_eq!(kind(StreamError::Decode("eof".into())), PublishErrorKind::MalformedResponse);
        assert_eq!(
            kind(StreamError::Service {
                status: 500,
                code: "InternalServerError".into(),
                message: "oops".into(),
            }),
            PublishErrorKind::Service
        );
    }
}
