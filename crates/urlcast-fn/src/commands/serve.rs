//! serve command - run as a function behind the FDK listener

use anyhow::{Context, Result};
use tracing::info;
use urlcast_core::UrlcastConfig;

use crate::server::{self, ListenAddr};

pub async fn execute(config: &UrlcastConfig) -> Result<()> {
    let listener = config
        .function
        .listener
        .as_deref()
        .context("FN_LISTENER is not set; use `invoke` to run outside the function runtime")?;
    let addr = ListenAddr::parse(listener)?;

    let relay = super::build_relay(config)?;
    info!(
        "Serving invocations for region {} with publish failure policy {:?}",
        config.region, config.function.publish_failure
    );

    server::serve(relay, addr).await?;
    Ok(())
}
