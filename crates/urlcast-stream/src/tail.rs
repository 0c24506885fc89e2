//! Consumer-group tailing for operators
//!
//! Creates a group cursor lazily and follows `opc-next-cursor` from page to
//! page. When a read fails the cursor is dropped and recreated on the next
//! poll; with `commitOnGet` the group resumes from its committed offsets.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::StreamClient;
use crate::error::StreamResult;
use crate::model::{CreateGroupCursorDetails, StreamMessage};

pub struct StreamTail {
    client: Arc<dyn StreamClient>,
    stream_id: String,
    cursor_details: CreateGroupCursorDetails,
    limit: Option<u32>,
    cursor: Option<String>,
}

impl StreamTail {
    pub fn new(
        client: Arc<dyn StreamClient>,
        stream_id: impl Into<String>,
        cursor_details: CreateGroupCursorDetails,
        limit: Option<u32>,
    ) -> Self {
        Self {
            client,
            stream_id: stream_id.into(),
            cursor_details,
            limit,
            cursor: None,
        }
    }

    /// Fetch the next page of messages
    pub async fn next_batch(&mut self) -> StreamResult<Vec<StreamMessage>> {
        let cursor = match self.cursor.take() {
            Some(cursor) => cursor,
            None => {
                info!(
                    "Creating a cursor for group {}, instance {}",
                    self.cursor_details.group_name, self.cursor_details.instance_name
                );
                self.client
                    .create_group_cursor(&self.stream_id, &self.cursor_details)
                    .await?
                    .value
            }
        };

        match self
            .client
            .get_messages(&self.stream_id, &cursor, self.limit)
            .await
        {
            Ok(response) => {
                debug!("Read {} messages", response.messages.len());
                if response.next_cursor.is_none() {
                    warn!("Response carried no next cursor, a new group cursor will be created");
                }
                self.cursor = response.next_cursor;
                Ok(response.messages)
            }
            Err(e) => {
                warn!("Failed to read messages, dropping cursor: {}", e);
                Err(e)
            }
        }
    }
}
