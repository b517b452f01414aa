//! Marble Thread library - turn-based games played in a social media thread
//!
//! The game driver narrates each round into one reply chain, asks the
//! platform's users for the next move, and falls back to a random move when
//! nobody answers in time.
//!
//! # Architecture
//!
//! - **Platform**: the [`Platform`] seam, with a networked [`TwitterClient`]
//!   and an offline [`LocalConsole`] stand-in
//! - **Poster**: numbered narration messages ([`post`], [`post_image`])
//! - **Turn**: the reply-polling resolver ([`resolve_turn`])
//! - **Config**: account credentials ([`AccountConfig`])
//!
//! # Example
//!
//! ```no_run
//! use marble_thread::{AccountConfig, TurnSettings, TwitterClient, post, resolve_turn};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AccountConfig::from_file("account.toml")?;
//! let client = TwitterClient::connect(&config).await?;
//!
//! let intro = post(&client, "There are 21 marbles on the table.", 1, None).await?;
//! let turn = resolve_turn(
//!     &client,
//!     "Your move.",
//!     Some(intro.id()),
//!     *intro.counter(),
//!     &TurnSettings::default(),
//! )
//! .await?;
//! println!("{} takes {}", turn.author(), turn.value());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod account_config;
mod platform;
mod poster;
mod turn;

// Crate-level exports - Configuration
pub use account_config::{AccountConfig, ConfigError};

// Crate-level exports - Platform seam and destinations
pub use platform::{
    Credentials, Destination, LOCAL_AUTHOR, LocalConsole, Message, MessageId, OAuthSigner,
    Platform, PlatformError, PlatformErrorKind, Post, StdioConsole, TwitterClient, default_viewer,
};

// Crate-level exports - Poster
pub use poster::{Posted, numbered, post, post_image};

// Crate-level exports - Turn resolution
pub use turn::{Move, MoveError, RANDOM_AUTHOR, TurnOutcome, TurnSettings, parse_reply, resolve_turn};
