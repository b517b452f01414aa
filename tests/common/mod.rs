//! Scripted in-memory platform shared by the integration tests.

#![allow(dead_code)]

use marble_thread::{Message, MessageId, Platform, PlatformError, PlatformErrorKind, Post};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub const ACCOUNT: &str = "marbles";

/// What the next reply query does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Return these replies.
    Replies(Vec<Message>),
    /// Fail the query.
    Fail,
    /// Never complete.
    Hang,
}

/// Platform that plays back scripted query results and records every publish.
///
/// Once the script runs out, queries return no replies.
#[derive(Debug, Default)]
pub struct ScriptedPlatform {
    script: Mutex<VecDeque<Step>>,
    published: Mutex<Vec<Post>>,
    next_id: AtomicU64,
    queries: AtomicUsize,
    fail_publish_containing: Mutex<Option<String>>,
}

impl ScriptedPlatform {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            next_id: AtomicU64::new(100),
            ..Default::default()
        }
    }

    /// Makes every publish whose text contains `needle` fail.
    pub fn fail_publishes_containing(self, needle: &str) -> Self {
        *self.fail_publish_containing.lock().unwrap() = Some(needle.to_string());
        self
    }

    pub fn published(&self) -> Vec<Post> {
        self.published.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Publishes whose text contains `needle`.
    pub fn published_containing(&self, needle: &str) -> Vec<Post> {
        self.published()
            .into_iter()
            .filter(|p| p.text().contains(needle))
            .collect()
    }
}

#[async_trait::async_trait]
impl Platform for ScriptedPlatform {
    fn account(&self) -> &str {
        ACCOUNT
    }

    async fn publish(&self, post: &Post) -> Result<Message, PlatformError> {
        let failing = self.fail_publish_containing.lock().unwrap().clone();
        if let Some(needle) = failing {
            if post.text().contains(&needle) {
                return Err(PlatformError::new(
                    PlatformErrorKind::Api,
                    "scripted publish failure",
                ));
            }
        }

        self.published.lock().unwrap().push(post.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Message::new(
            MessageId::from(format!("m{}", id)),
            ACCOUNT.to_string(),
            post.text().clone(),
        ))
    }

    async fn replies_to(
        &self,
        account: &str,
        _since: &MessageId,
    ) -> Result<Vec<Message>, PlatformError> {
        assert_eq!(account, ACCOUNT);
        self.queries.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            None => Ok(Vec::new()),
            Some(Step::Replies(replies)) => Ok(replies),
            Some(Step::Fail) => Err(PlatformError::new(
                PlatformErrorKind::Transport,
                "scripted query failure",
            )),
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

/// A reply from `author` with body `@marbles <body>`.
pub fn reply(id: &str, author: &str, body: &str) -> Message {
    Message::new(
        MessageId::from(id),
        author.to_string(),
        format!("@{} {}", ACCOUNT, body),
    )
}
