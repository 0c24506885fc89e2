//! Stream record and publish outcome types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// A keyed record bound for the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    key: String,
    value: Bytes,
}

impl Message {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Record announcing an object URL on the fixed `bucketUrl` key
    pub fn bucket_url(url: &str) -> Self {
        Self::new(crate::MESSAGE_KEY, Bytes::copy_from_slice(url.as_bytes()))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

/// Durable position of a published record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub offset: i64,
    pub partition: i32,
}

impl std::fmt::Display for PublishReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offset {} in partition {}", self.offset, self.partition)
    }
}

/// Outcome of one publish attempt
pub type PublishResult = std::result::Result<PublishReceipt, PublishError>;
