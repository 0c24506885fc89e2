//! Single-record stream producer

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use urlcast_auth::KeyProvider;
use urlcast_core::config::StreamConfig;
use urlcast_core::types::{Message, PublishReceipt, PublishResult};
use urlcast_core::PublishError;

use crate::client::StreamClient;
use crate::http::HttpStreamClient;
use crate::model::{PutMessagesDetails, PutMessagesResult};

/// Publishes one keyed record per call and reports where it landed.
///
/// There is no retry and no batching: each call is exactly one request and
/// yields exactly one [`PublishResult`].
#[derive(Clone)]
pub struct StreamProducer {
    client: Arc<dyn StreamClient>,
    stream_id: String,
    timeout: Duration,
}

impl StreamProducer {
    pub fn new(client: Arc<dyn StreamClient>, stream_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            stream_id: stream_id.into(),
            timeout,
        }
    }

    /// Build the signed HTTP client for `config` and wrap it.
    ///
    /// `provider` has already loaded its credentials, so a producer only
    /// exists once authentication has succeeded.
    pub fn connect(config: &StreamConfig, provider: Arc<dyn KeyProvider>) -> urlcast_core::Result<Self> {
        config.validate()?;
        let client = HttpStreamClient::new(config, provider)?;
        info!(
            "Stream producer ready for {} via {}",
            config.stream_id, config.endpoint
        );
        Ok(Self::new(Arc::new(client), &config.stream_id, config.timeout()))
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Publish `message` and interpret the per-record outcome
    pub async fn produce(&self, message: &Message) -> PublishResult {
        let details = PutMessagesDetails::single(message);

        let outcome = tokio::time::timeout(
            self.timeout,
            self.client.put_messages(&self.stream_id, &details),
        )
        .await;

        let result = match outcome {
            Err(_) => Err(PublishError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(response)) => interpret(response),
        };

        match &result {
            Ok(receipt) => info!(
                stream = %self.stream_id,
                key = message.key(),
                offset = receipt.offset,
                partition = receipt.partition,
                "Message pushed to {}",
                receipt
            ),
            Err(e) => warn!(
                stream = %self.stream_id,
                key = message.key(),
                kind = %e.kind(),
                "Put message error: {}",
                e
            ),
        }

        result
    }
}

fn interpret(response: PutMessagesResult) -> PublishResult {
    let mut entries = response.entries.into_iter();

    let entry = entries
        .next()
        .ok_or_else(|| PublishError::MalformedResponse("response has no entries".into()))?;
    if entries.next().is_some() {
        return Err(PublishError::MalformedResponse(
            "response has more than one entry for a single record".into(),
        ));
    }

    if let Some(code) = entry.error {
        return Err(PublishError::PerRecord {
            code,
            message: entry.error_message.unwrap_or_default(),
        });
    }

    let offset = entry
        .offset
        .ok_or_else(|| PublishError::MalformedResponse("entry has no offset".into()))?;
    let partition = entry
        .partition
        .as_ref()
        .and_then(|p| p.as_i32())
        .ok_or_else(|| {
            PublishError::MalformedResponse(format!(
                "entry has no usable partition: {:?}",
                entry.partition
            ))
        })?;

    Ok(PublishReceipt { offset, partition })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StreamError, StreamResult};
    use crate::model::{
        CreateGroupCursorDetails, Cursor, GetMessagesResponse, PartitionId, PutMessagesResultEntry,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use urlcast_core::PublishErrorKind;

    enum Behavior {
        Respond(PutMessagesResult),
        Fail(fn() -> StreamError),
        Hang,
    }

    struct StubClient {
        behavior: Behavior,
        calls: Mutex<Vec<PutMessagesDetails>>,
    }

    impl StubClient {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StreamClient for StubClient {
        async fn put_messages(
            &self,
            _stream_id: &str,
            details: &PutMessagesDetails,
        ) -> StreamResult<PutMessagesResult> {
            self.calls.lock().unwrap().push(details.clone());
            match &self.behavior {
                Behavior::Respond(result) => Ok(result.clone()),
                Behavior::Fail(make) => Err(make()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }

        async fn create_group_cursor(
            &self,
            _stream_id: &str,
            _details: &CreateGroupCursorDetails,
        ) -> StreamResult<Cursor> {
            unimplemented!()
        }

        async fn get_messages(
            &self,
            _stream_id: &str,
            _cursor: &str,
            _limit: Option<u32>,
        ) -> StreamResult<GetMessagesResponse> {
            unimplemented!()
        }
    }

    fn entry(partition: &str, offset: i64) -> PutMessagesResultEntry {
        PutMessagesResultEntry {
            partition: Some(PartitionId::Text(partition.into())),
            offset: Some(offset),
            timestamp: None,
            error: None,
            error_message: None,
        }
    }

    fn producer(client: Arc<StubClient>) -> StreamProducer {
        StreamProducer::new(client, "ocid1.stream.oc1.iad.example", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_produce_success() {
        let client = StubClient::new(Behavior::Respond(PutMessagesResult {
            failures: 0,
            entries: vec![entry("0", 42)],
        }));
        let producer = producer(client.clone());

        let receipt = producer
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await
            .unwrap();

        assert_eq!(
            receipt,
            PublishReceipt {
                offset: 42,
                partition: 0
            }
        );

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_produce_per_record_error() {
        let client = StubClient::new(Behavior::Respond(PutMessagesResult {
            failures: 1,
            entries: vec![PutMessagesResultEntry {
                partition: None,
                offset: None,
                timestamp: None,
                error: Some("429".into()),
                error_message: Some("Throttled".into()),
            }],
        }));

        let err = producer(client)
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), PublishErrorKind::PerRecord);
        assert_eq!(err.code(), "PerRecordError");
        assert!(err.to_string().contains("Throttled"));
    }

    #[tokio::test]
    async fn test_produce_transport_fault() {
        let client = StubClient::new(Behavior::Fail(|| {
            StreamError::Transport("connection reset by peer".into())
        }));

        let result = producer(client)
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await;

        assert!(matches!(result, Err(PublishError::Transport(ref m)) if m.contains("reset")));
    }

    #[tokio::test]
    async fn test_produce_auth_fault() {
        let client = StubClient::new(Behavior::Fail(|| {
            StreamError::Auth(urlcast_auth::AuthError::InvalidToken("expired".into()))
        }));

        let err = producer(client)
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), PublishErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_produce_client_timeout() {
        let client = StubClient::new(Behavior::Fail(|| {
            StreamError::Timeout(Duration::from_secs(4))
        }));

        let err = producer(client)
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), PublishErrorKind::Timeout);
        assert_eq!(err, PublishError::Timeout(Duration::from_secs(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_produce_times_out() {
        let client = StubClient::new(Behavior::Hang);
        let producer = StreamProducer::new(client, "stream", Duration::from_secs(2));

        let err = producer
            .produce(&Message::bucket_url("https://example.com/o/obj1"))
            .await
            .unwrap_err();
        assert_eq!(err, PublishError::Timeout(Duration::from_secs(2)));
    }

    #[test]
    fn test_interpret_malformed() {
        let empty = PutMessagesResult {
            failures: 0,
            entries: vec![],
        };
        assert_eq!(
            interpret(empty).unwrap_err().kind(),
            PublishErrorKind::MalformedResponse
        );

        let two = PutMessagesResult {
            failures: 0,
            entries: vec![entry("0", 1), entry("0", 2)],
        };
        assert!(interpret(two).is_err());

        let bad_partition = PutMessagesResult {
            failures: 0,
            entries: vec![entry("zero", 1)],
        };
        assert!(interpret(bad_partition).is_err());
    }
}
