//! Streaming API wire types
//!
//! Keys and values travel base64 encoded in both directions.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use urlcast_core::types::Message;

use crate::error::{StreamError, StreamResult};

// ============================================================================
// PutMessages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutMessagesDetailsEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

impl From<&Message> for PutMessagesDetailsEntry {
    fn from(message: &Message) -> Self {
        Self {
            key: Some(STANDARD.encode(message.key().as_bytes())),
            value: STANDARD.encode(message.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutMessagesDetails {
    pub messages: Vec<PutMessagesDetailsEntry>,
}

impl PutMessagesDetails {
    /// Request body carrying exactly one record
    pub fn single(message: &Message) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

/// Partition ids are strings on the wire; older responses used numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionId {
    Text(String),
    Number(i64),
}

impl PartitionId {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PartitionId::Text(s) => s.trim().parse().ok(),
            PartitionId::Number(n) => i32::try_from(*n).ok(),
        }
    }
}

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionId::Text(s) => write!(f, "{}", s),
            PartitionId::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutMessagesResultEntry {
    #[serde(default)]
    pub partition: Option<PartitionId>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutMessagesResult {
    #[serde(default)]
    pub failures: u32,
    #[serde(default)]
    pub entries: Vec<PutMessagesResultEntry>,
}

// ============================================================================
// Group cursors and GetMessages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CursorType {
    AtTime,
    Latest,
    TrimHorizon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupCursorDetails {
    pub group_name: String,
    pub instance_name: String,
    #[serde(rename = "type")]
    pub cursor_type: CursorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub commit_on_get: bool,
}

impl CreateGroupCursorDetails {
    /// Start from the oldest retained message
    pub fn trim_horizon(group: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            group_name: group.into(),
            instance_name: instance.into(),
            cursor_type: CursorType::TrimHorizon,
            time: None,
            commit_on_get: true,
        }
    }

    /// Start from messages appended at or after `time`
    pub fn at_time(
        group: impl Into<String>,
        instance: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            group_name: group.into(),
            instance_name: instance.into(),
            cursor_type: CursorType::AtTime,
            time: Some(time),
            commit_on_get: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMessage {
    pub stream: String,
    pub partition: PartitionId,
    #[serde(default)]
    pub key: Option<String>,
    pub value: String,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
}

impl StreamMessage {
    pub fn decoded_key(&self) -> StreamResult<Option<Vec<u8>>> {
        self.key
            .as_deref()
            .map(|k| {
                STANDARD
                    .decode(k)
                    .map_err(|e| StreamError::Decode(format!("message key: {}", e)))
            })
            .transpose()
    }

    pub fn decoded_value(&self) -> StreamResult<Vec<u8>> {
        STANDARD
            .decode(&self.value)
            .map_err(|e| StreamError::Decode(format!("message value: {}", e)))
    }
}

/// A page of messages plus the cursor for the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMessagesResponse {
    pub messages: Vec<StreamMessage>,
    pub next_cursor: Option<String>,
}

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
