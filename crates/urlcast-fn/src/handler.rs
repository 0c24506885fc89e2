//! Invocation handling: decode, compose, publish

use std::sync::Arc;

use tracing::{debug, info, warn};

use urlcast_core::config::PublishFailurePolicy;
use urlcast_core::types::{decode_body, Message, PublishResult};
use urlcast_core::{Error, Result};
use urlcast_stream::StreamProducer;

/// Result of a completed invocation
#[derive(Debug)]
pub struct Invocation {
    /// Derived object URL, the invocation's response
    pub url: String,
    /// Outcome of the publish side effect
    pub publish: PublishResult,
}

/// Process-wide handler state, built once at startup
#[derive(Clone)]
pub struct Relay {
    region: Arc<str>,
    producer: StreamProducer,
    publish_failure: PublishFailurePolicy,
}

impl Relay {
    pub fn new(
        region: impl Into<Arc<str>>,
        producer: StreamProducer,
        publish_failure: PublishFailurePolicy,
    ) -> Self {
        Self {
            region: region.into(),
            producer,
            publish_failure,
        }
    }

    /// Handle one raw event body.
    ///
    /// Decode failures always fail the invocation. A failed publish fails it
    /// only under [`PublishFailurePolicy::Fail`]; otherwise the URL is still
    /// returned and the failure is reported in [`Invocation::publish`].
    #[tracing::instrument(skip(self, body), fields(region = %self.region))]
    pub async fn handle(&self, body: &[u8]) -> Result<Invocation> {
        let (context, event) = decode_body(body)?;

        if let Some(context) = &context {
            debug!(
                event_id = %context.id,
                event_type = %context.event_type,
                source = %context.source,
                "Received CloudEvent"
            );
        }

        let url = event.object_url(&self.region);
        info!(
            namespace = event.namespace(),
            bucket = event.bucket_name(),
            object = %event.resource_name,
            "Composed object URL {}",
            url
        );

        let publish = self.producer.produce(&Message::bucket_url(&url)).await;

        if let Err(e) = &publish {
            match self.publish_failure {
                PublishFailurePolicy::Fail => return Err(Error::Publish(e.clone())),
                PublishFailurePolicy::Log => {
                    warn!("Publish failed, returning URL anyway: {}", e)
                }
            }
        }

        Ok(Invocation { url, publish })
    }
}
