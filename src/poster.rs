//! Numbered narration posts.

use crate::platform::{MessageId, Platform, PlatformError, Post};
use derive_getters::Getters;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// Result of publishing one numbered message.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct Posted {
    /// Identifier of the new message, the next thread anchor.
    id: MessageId,
    /// Counter to use for the next message.
    counter: u64,
}

/// Prefixes `text` with its sequence number: `"<counter>/\n\n<text>"`.
pub fn numbered(counter: u64, text: &str) -> String {
    format!("{}/\n\n{}", counter, text)
}

/// Publishes `text` as message number `counter`, optionally replying to
/// `reply_to`.
///
/// Transport errors propagate unchanged; nothing is retried.
#[instrument(skip(platform, text), fields(account = %platform.account()))]
pub async fn post(
    platform: &dyn Platform,
    text: &str,
    counter: u64,
    reply_to: Option<&MessageId>,
) -> Result<Posted, PlatformError> {
    let post = Post::new(numbered(counter, text)).in_reply_to_opt(reply_to);
    publish_numbered(platform, post, counter).await
}

/// Like [`post`], with an image attached.
#[instrument(skip(platform, text, image), fields(account = %platform.account(), image = %image.display()))]
pub async fn post_image(
    platform: &dyn Platform,
    text: &str,
    image: &Path,
    counter: u64,
    reply_to: Option<&MessageId>,
) -> Result<Posted, PlatformError> {
    let post = Post::new(numbered(counter, text))
        .in_reply_to_opt(reply_to)
        .with_image(image);
    publish_numbered(platform, post, counter).await
}

async fn publish_numbered(
    platform: &dyn Platform,
    post: Post,
    counter: u64,
) -> Result<Posted, PlatformError> {
    let message = platform.publish(&post).await?;
    info!(id = %message.id(), counter, "Posted numbered message");
    Ok(Posted {
        id: message.id().clone(),
        counter: counter + 1,
    })
}
