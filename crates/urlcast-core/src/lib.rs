//! Urlcast Core Library
//!
//! Event decoding, object URL composition, configuration and the error
//! taxonomy shared by the urlcast crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::UrlcastConfig;
pub use error::{Error, PublishError, PublishErrorKind, Result};

/// Urlcast version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Region used when `REGION` is not configured
pub const DEFAULT_REGION: &str = "your-region";

/// Key carried by every record published to the stream
pub const MESSAGE_KEY: &str = "bucketUrl";

/// Streaming REST API version
pub const STREAMING_API_VERSION: &str = "20180418";
