//! urlcast - publishes the URL of every newly created object to a stream
//!
//! Runs as a function behind the Fn FDK listener, or locally through the
//! `invoke` and `tail` commands.

mod commands;
mod handler;
mod logging;
mod server;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use urlcast_core::config::{AuthMode, PublishFailurePolicy};
use urlcast_core::UrlcastConfig;

use crate::commands::tail::TailArgs;

#[derive(Parser)]
#[command(name = "urlcast")]
#[command(author = "Urlcast Team")]
#[command(version = urlcast_core::VERSION)]
#[command(about = "Publish object storage URLs to a stream", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Region used in composed URLs
    #[arg(long, global = true)]
    region: Option<String>,

    /// Target stream OCID
    #[arg(long, global = true)]
    stream_id: Option<String>,

    /// Streaming messages endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Credential source (resource-principal, api-key)
    #[arg(long, global = true)]
    auth_mode: Option<AuthMode>,

    /// Profile in the CLI config file
    #[arg(long, global = true)]
    profile: Option<String>,

    /// What a failed publish does to the invocation (log, fail)
    #[arg(long, global = true)]
    publish_failure: Option<PublishFailurePolicy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve invocations on FN_LISTENER
    Serve,

    /// Run one invocation locally
    Invoke {
        /// Event JSON file, or - for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },

    /// Print messages as seen by a consumer group
    Tail {
        /// Consumer group name
        #[arg(long, default_value = "urlcast-tail")]
        group: String,

        /// Instance name within the group
        #[arg(long, default_value = "urlcast-tail-1")]
        instance: String,

        /// Start from the oldest retained message instead of five minutes ago
        #[arg(long)]
        from_start: bool,

        /// Maximum messages per poll
        #[arg(long)]
        limit: Option<u32>,

        /// Delay between polls in milliseconds
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("urlcast {}", urlcast_core::VERSION);
        return Ok(());
    }

    let config = load_config(&cli)?;
    logging::init(&config.logging);
    debug!("Configuration: {:?}", config);

    match cli.command {
        Some(Commands::Invoke { event }) => commands::invoke::execute(&config, &event).await?,
        Some(Commands::Tail {
            group,
            instance,
            from_start,
            limit,
            poll_ms,
        }) => {
            commands::tail::execute(
                &config,
                TailArgs {
                    group,
                    instance,
                    from_start,
                    limit,
                    poll_ms,
                },
            )
            .await?
        }
        Some(Commands::Serve) | None => {
            info!("Starting urlcast {}", urlcast_core::VERSION);
            commands::serve::execute(&config).await?
        }
        Some(Commands::Version) => {}
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<UrlcastConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        UrlcastConfig::from_file(config_path)?
    } else {
        UrlcastConfig::from_env()?
    };

    // Override with CLI args
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(stream_id) = &cli.stream_id {
        config.stream.stream_id = stream_id.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.stream.endpoint = endpoint.clone();
    }
    if let Some(mode) = cli.auth_mode {
        config.auth.mode = mode;
    }
    if let Some(profile) = &cli.profile {
        config.auth.profile = profile.clone();
    }
    if let Some(policy) = cli.publish_failure {
        config.function.publish_failure = policy;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}
