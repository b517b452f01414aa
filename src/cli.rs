//! Command-line interface for marble_thread.

use clap::{Parser, Subcommand};
use marble_thread::Destination;
use std::path::PathBuf;

/// Marble Thread - play a game turn in a social media reply thread
#[derive(Parser, Debug)]
#[command(name = "marble_thread")]
#[command(about = "Narrate a game and collect moves from public replies", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the account config (TOML). Falls back to MARBLE_THREAD_* env vars.
    #[arg(long, global = true, default_value = "account.toml")]
    pub config: PathBuf,

    /// Where posts go: `twitter` or `local`
    #[arg(long, global = true, default_value_t = Destination::Twitter)]
    pub destination: Destination,

    /// Rehearse offline: print posts and type replies at the terminal.
    /// Shorthand for `--destination local`.
    #[arg(long, global = true, conflicts_with = "destination")]
    pub local: bool,

    /// Command used to open images in local mode
    #[arg(long, global = true)]
    pub viewer: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the credentials and print the authenticated handle
    Verify,

    /// Publish one numbered message
    Post {
        /// Message text
        text: String,

        /// Sequence number to prefix the message with
        #[arg(short, long)]
        counter: u64,

        /// Message to reply to
        #[arg(short, long)]
        reply_to: Option<String>,

        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Ask for the next move and wait for a reply
    Turn {
        /// Narrative to place before the move instructions
        narrative: String,

        /// Sequence number of the prompt message
        #[arg(short, long)]
        counter: u64,

        /// Message the prompt replies to
        #[arg(short, long)]
        anchor: Option<String>,

        /// Seconds to wait for a valid reply before choosing at random
        #[arg(long, default_value = "600")]
        max_wait: u64,

        /// Seconds between reply queries
        #[arg(long, default_value = "5")]
        poll_interval: u64,

        /// Seconds before a single reply query is abandoned
        #[arg(long, default_value = "30")]
        query_timeout: u64,
    },
}
