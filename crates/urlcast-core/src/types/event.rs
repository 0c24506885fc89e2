//! Object-created notification types
//!
//! The runtime hands us either a structured CloudEvent whose `data` member is
//! the notification payload, or the payload on its own. Both the 1.0
//! envelope (`specversion`) and the 0.1 envelope (`cloudEventsVersion`) that
//! OCI Events emits are recognized. Only three fields of
//! the payload matter: `resourceName`, `additionalDetails.namespace` and
//! `additionalDetails.bucketName`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

use super::compose_object_url;

/// Decoded object-created notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Object name within the bucket
    pub resource_name: String,
    pub additional_details: AdditionalDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalDetails {
    pub namespace: String,
    pub bucket_name: String,
}

impl NotificationEvent {
    /// Extract the notification fields from an untyped payload.
    ///
    /// Either every field is present and a non-empty string, or the whole
    /// decode fails; a partially populated event is never returned.
    pub fn decode(payload: &Value) -> Result<Self> {
        let resource_name = required_str(payload, &["resourceName"])?;
        let namespace = required_str(payload, &["additionalDetails", "namespace"])?;
        let bucket_name = required_str(payload, &["additionalDetails", "bucketName"])?;

        Ok(Self {
            resource_name: resource_name.to_string(),
            additional_details: AdditionalDetails {
                namespace: namespace.to_string(),
                bucket_name: bucket_name.to_string(),
            },
        })
    }

    pub fn namespace(&self) -> &str {
        &self.additional_details.namespace
    }

    pub fn bucket_name(&self) -> &str {
        &self.additional_details.bucket_name
    }

    /// Retrieval URL of the referenced object in `region`
    pub fn object_url(&self, region: &str) -> String {
        compose_object_url(
            region,
            self.namespace(),
            self.bucket_name(),
            &self.resource_name,
        )
    }
}

fn required_str<'a>(payload: &'a Value, path: &[&str]) -> Result<&'a str> {
    let mut current = payload;

    for (depth, segment) in path.iter().enumerate() {
        let object = current.as_object().ok_or_else(|| {
            let parent = if depth == 0 {
                "payload".to_string()
            } else {
                path[..depth].join(".")
            };
            Error::Decode(format!("{} is not an object", parent))
        })?;

        current = object.get(*segment).ok_or_else(|| {
            Error::Decode(format!("missing field {}", path[..=depth].join(".")))
        })?;
    }

    match current {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::String(_) => Err(Error::Decode(format!("{} is empty", path.join(".")))),
        _ => Err(Error::Decode(format!("{} is not a string", path.join(".")))),
    }
}

/// Structured-mode CloudEvent envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudEvent {
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// CloudEvents 0.1 envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCloudEvent {
    pub cloud_events_version: String,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type_version: Option<String>,
    pub source: String,
    #[serde(rename = "eventID")]
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Envelope attributes kept for logging once the payload is extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub id: String,
    pub event_type: String,
    pub source: String,
}

/// Split an incoming body into optional envelope context and payload.
///
/// A JSON object carrying `specversion` or `cloudEventsVersion` is treated
/// as a structured CloudEvent and must have `data`; anything else is taken
/// as the payload.
pub fn unwrap_envelope(body: Value) -> Result<(Option<EventContext>, Value)> {
    let (is_v1, is_v01) = match body.as_object() {
        Some(o) => (o.contains_key("specversion"), o.contains_key("cloudEventsVersion")),
        None => (false, false),
    };

    let (context, data) = if is_v1 {
        let event: CloudEvent = serde_json::from_value(body)
            .map_err(|e| Error::Decode(format!("invalid CloudEvent envelope: {}", e)))?;
        let context = EventContext {
            id: event.id,
            event_type: event.event_type,
            source: event.source,
        };
        (context, event.data)
    } else if is_v01 {
        let event: LegacyCloudEvent = serde_json::from_value(body)
            .map_err(|e| Error::Decode(format!("invalid CloudEvent 0.1 envelope: {}", e)))?;
        let context = EventContext {
            id: event.event_id,
            event_type: event.event_type,
            source: event.source,
        };
        (context, event.data)
    } else {
        return Ok((None, body));
    };

    let data = data.ok_or_else(|| Error::Decode("CloudEvent has no data".into()))?;
    Ok((Some(context), data))
}

/// Parse raw bytes into envelope context and decoded notification
pub fn decode_body(body: &[u8]) -> Result<(Option<EventContext>, NotificationEvent)> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::Decode(format!("body is not JSON: {}", e)))?;
    let (context, payload) = unwrap_envelope(value)?;
    let event = NotificationEvent::decode(&payload)?;
    Ok((context, event))
}
