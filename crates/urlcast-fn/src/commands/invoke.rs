//! invoke command - run one invocation locally

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use urlcast_core::UrlcastConfig;

pub async fn execute(config: &UrlcastConfig, event: &str) -> Result<()> {
    let body = read_event(event).await?;
    let relay = super::build_relay(config)?;

    let invocation = relay.handle(&body).await?;

    match &invocation.publish {
        Ok(receipt) => info!("Published: {}", receipt),
        Err(e) => warn!(kind = %e.kind(), "Not published: {}", e),
    }
    println!("{}", invocation.url);

    Ok(())
}

/// Read the event body from a file, or stdin when `source` is `-`
pub async fn read_event(source: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    if source == "-" {
        tokio::io::stdin()
            .read_to_end(&mut body)
            .await
            .context("Failed to read event from stdin")?;
    } else {
        body = tokio::fs::read(Path::new(source))
            .await
            .with_context(|| format!("Failed to read event file {}", source))?;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"resourceName":"obj1"}}"#).unwrap();

        let body = read_event(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(body, br#"{"resourceName":"obj1"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_read_event_missing_file() {
        let err = read_event("/nonexistent/event.json").await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/event.json"));
    }
}
