//! tail command - print what a consumer group sees on the stream

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use urlcast_core::UrlcastConfig;
use urlcast_stream::model::{CreateGroupCursorDetails, StreamMessage};
use urlcast_stream::{HttpStreamClient, StreamTail};

pub struct TailArgs {
    pub group: String,
    pub instance: String,
    pub from_start: bool,
    pub limit: Option<u32>,
    pub poll_ms: u64,
}

pub async fn execute(config: &UrlcastConfig, args: TailArgs) -> Result<()> {
    let provider = super::key_provider(config)?;
    let client = HttpStreamClient::new(&config.stream, provider)
        .context("Failed to create stream client")?;

    let details = if args.from_start {
        CreateGroupCursorDetails::trim_horizon(&args.group, &args.instance)
    } else {
        CreateGroupCursorDetails::at_time(
            &args.group,
            &args.instance,
            Utc::now() - chrono::Duration::minutes(5),
        )
    };

    let mut tail = StreamTail::new(
        Arc::new(client),
        config.stream.stream_id.as_str(),
        details,
        args.limit,
    );
    let poll = Duration::from_millis(args.poll_ms);

    info!(
        "Tailing {} as {}/{}",
        config.stream.stream_id, args.group, args.instance
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped");
                return Ok(());
            }
            batch = tail.next_batch() => match batch {
                Ok(messages) => {
                    for message in &messages {
                        println!("{}", render(message));
                    }
                }
                Err(e) => warn!("Poll failed: {}", e),
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped");
                return Ok(());
            }
            _ = tokio::time::sleep(poll) => {}
        }
    }
}

fn render(message: &StreamMessage) -> String {
    match message.decoded_value() {
        Ok(value) => format!("[MESSAGE] {}", String::from_utf8_lossy(&value)),
        Err(e) => format!("[MESSAGE] <undecodable at offset {}: {}>", message.offset, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urlcast_stream::model::PartitionId;

    fn message(value: &str) -> StreamMessage {
        StreamMessage {
            stream: "urls".into(),
            partition: PartitionId::Text("0".into()),
            key: None,
            value: value.into(),
            offset: 3,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_render_decodes_value() {
        // "https://x/o/obj1"
        assert_eq!(
            render(&message("aHR0cHM6Ly94L28vb2JqMQ==")),
            "[MESSAGE] https://x/o/obj1"
        );
    }

    #[test]
    fn test_render_bad_base64() {
        assert!(render(&message("%%%")).contains("offset 3"));
    }
}
