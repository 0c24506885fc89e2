//! Stream client abstraction

use async_trait::async_trait;

use crate::error::StreamResult;
use crate::model::{
    CreateGroupCursorDetails, Cursor, GetMessagesResponse, PutMessagesDetails, PutMessagesResult,
};

/// Operations the relay needs from the streaming service.
///
/// Implementations are shared across concurrent invocations and must not
/// re-authenticate per call.
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Append records to a stream
    async fn put_messages(
        &self,
        stream_id: &str,
        details: &PutMessagesDetails,
    ) -> StreamResult<PutMessagesResult>;

    /// Create a consumer-group cursor
    async fn create_group_cursor(
        &self,
        stream_id: &str,
        details: &CreateGroupCursorDetails,
    ) -> StreamResult<Cursor>;

    /// Read a page of messages starting at `cursor`
    async fn get_messages(
        &self,
        stream_id: &str,
        cursor: &str,
        limit: Option<u32>,
    ) -> StreamResult<GetMessagesResponse>;
}
