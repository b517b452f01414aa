//! Social platform abstraction: messages, publish requests, and destinations.
//!
//! The game core only ever talks to a [`Platform`]. Two destinations exist:
//! the networked [`TwitterClient`] and the offline [`LocalConsole`] used to
//! rehearse a game from the terminal.

mod local;
mod oauth;
mod twitter;

pub use local::{LOCAL_AUTHOR, LocalConsole, StdioConsole, default_viewer};
pub use oauth::{Credentials, OAuthSigner};
pub use twitter::TwitterClient;

use derive_getters::Getters;
use derive_more::{Display, Error, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Opaque identifier of a published message.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A message as produced by the platform. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Message {
    /// Platform identifier.
    id: MessageId,
    /// Handle of the author, without the leading `@`.
    author: String,
    /// Full body text.
    text: String,
}

/// A request to publish a message.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Post {
    /// Body text, published verbatim.
    text: String,
    /// Message this one replies to, if any.
    reply_to: Option<MessageId>,
    /// Image to attach, if any.
    image: Option<PathBuf>,
}

impl Post {
    /// Creates a standalone post with the given body.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: None,
            image: None,
        }
    }

    /// Links the post to a parent message.
    pub fn in_reply_to(mut self, parent: MessageId) -> Self {
        self.reply_to = Some(parent);
        self
    }

    /// Links the post to a parent message when one is given.
    pub fn in_reply_to_opt(mut self, parent: Option<&MessageId>) -> Self {
        self.reply_to = parent.cloned();
        self
    }

    /// Attaches an image file.
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }
}

/// Transport that can publish messages and look up replies.
///
/// Implementations must be cheap to share by reference; the game core holds a
/// `&dyn Platform` for the lifetime of a session.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Handle of the account this session publishes as, without `@`.
    fn account(&self) -> &str;

    /// Publishes one message and returns it as stored by the platform.
    async fn publish(&self, post: &Post) -> Result<Message, PlatformError>;

    /// Returns the messages addressed to `account` that are newer than
    /// `since`, oldest first. Every call issues a fresh query.
    async fn replies_to(
        &self,
        account: &str,
        since: &MessageId,
    ) -> Result<Vec<Message>, PlatformError>;
}

/// Which transport a session publishes through.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Destination {
    /// The real platform over HTTPS.
    #[default]
    Twitter,
    /// The terminal stand-in for offline rehearsal.
    Local,
}

/// Broad category of a [`PlatformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PlatformErrorKind {
    /// The request never produced a response.
    Transport,
    /// The platform answered with a non-success status.
    Api,
    /// The response body could not be decoded.
    Decode,
    /// An attached image could not be read or shown.
    Media,
    /// Console input or output failed.
    Console,
    /// A request could not be signed.
    Signing,
}

/// Platform error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Platform error ({}): {} at {}:{}", kind, message, file, line)]
pub struct PlatformError {
    /// Error category.
    pub kind: PlatformErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PlatformError {
    /// Creates a new platform error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        debug!(%kind, error_message = %message, "Platform error created");
        Self {
            kind,
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            PlatformErrorKind::Decode
        } else if err.is_status() {
            PlatformErrorKind::Api
        } else {
            PlatformErrorKind::Transport
        };
        Self::new(kind, format!("HTTP error: {}", err))
    }
}

impl From<std::io::Error> for PlatformError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(PlatformErrorKind::Console, format!("I/O error: {}", err))
    }
}
