//! CLI command implementations

pub mod invoke;
pub mod serve;
pub mod tail;

use std::sync::Arc;

use anyhow::{Context, Result};
use urlcast_auth::KeyProvider;
use urlcast_core::UrlcastConfig;
use urlcast_stream::StreamProducer;

use crate::handler::Relay;

/// Load credentials for the configured auth mode
pub fn key_provider(config: &UrlcastConfig) -> Result<Arc<dyn KeyProvider>> {
    urlcast_auth::provider_from_config(&config.auth).context("Failed to load credentials")
}

/// Authenticate and build the invocation handler
pub fn build_relay(config: &UrlcastConfig) -> Result<Relay> {
    let provider = key_provider(config)?;
    let producer = StreamProducer::connect(&config.stream, provider)
        .context("Failed to create stream producer")?;

    Ok(Relay::new(
        config.region.as_str(),
        producer,
        config.function.publish_failure,
    ))
}
