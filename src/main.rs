//! Marble Thread - Unified CLI
//!
//! Publishes numbered game messages and resolves turns from public replies.
//! Results are printed to stdout as JSON so a game driver can chain calls.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use marble_thread::{
    AccountConfig, Destination, MessageId, Platform, StdioConsole, TurnSettings, TwitterClient,
    post, post_image, resolve_turn,
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Account handle used in local mode when no config is available.
const LOCAL_ACCOUNT: &str = "marble_thread";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    initialize_tracing();

    let destination = if cli.local {
        Destination::Local
    } else {
        cli.destination
    };
    let platform = connect(destination, &cli.config, cli.viewer.as_deref()).await?;

    match cli.command {
        Command::Verify => {
            println!("{}", platform.account());
        }
        Command::Post {
            text,
            counter,
            reply_to,
            image,
        } => {
            let reply_to = reply_to.map(MessageId::from);
            let posted = match image {
                Some(image) => {
                    post_image(platform.as_ref(), &text, &image, counter, reply_to.as_ref()).await?
                }
                None => post(platform.as_ref(), &text, counter, reply_to.as_ref()).await?,
            };
            println!("{}", serde_json::to_string(&posted)?);
        }
        Command::Turn {
            narrative,
            counter,
            anchor,
            max_wait,
            poll_interval,
            query_timeout,
        } => {
            let settings = TurnSettings::default()
                .with_max_wait(Duration::from_secs(max_wait))
                .with_poll_interval(Duration::from_secs(poll_interval))
                .with_query_timeout(Duration::from_secs(query_timeout));
            let anchor = anchor.map(MessageId::from);
            let outcome = resolve_turn(
                platform.as_ref(),
                &narrative,
                anchor.as_ref(),
                counter,
                &settings,
            )
            .await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
    }

    Ok(())
}

/// Builds the session for the chosen destination. Any failure here is fatal.
#[instrument(skip(config_path, viewer), fields(config_path = %config_path.display()))]
async fn connect(
    destination: Destination,
    config_path: &Path,
    viewer: Option<&str>,
) -> Result<Box<dyn Platform>> {
    match destination {
        Destination::Twitter => {
            let config = AccountConfig::load(config_path)?;
            info!(account = %config.account(), "Authenticating");
            let client = TwitterClient::connect(&config).await?;
            Ok(Box::new(client))
        }
        Destination::Local => {
            let account = if config_path.exists() {
                AccountConfig::from_file(config_path)?.account().clone()
            } else {
                AccountConfig::account_from_env().unwrap_or_else(|| LOCAL_ACCOUNT.to_string())
            };
            info!(account = %account, "Using local console stand-in");
            let mut console = StdioConsole::stdio(account);
            if let Some(viewer) = viewer {
                console = console.with_viewer(viewer);
            }
            Ok(Box::new(console))
        }
    }
}

/// Logs go to stderr so stdout carries only command results.
fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marble_thread=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Tracing initialized");
}
