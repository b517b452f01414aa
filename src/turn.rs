//! Turn resolution: prompt the thread, collect a move from replies, announce it.

use crate::platform::{Message, MessageId, Platform, PlatformError, Post};
use crate::poster::numbered;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, instrument, warn};

/// Author recorded when the move was chosen at random.
pub const RANDOM_AUTHOR: &str = "random";

const PROMPT_SUFFIX: &str = "\n\nTwitter users: it's your turn to choose how many marbles to take!\n\nReply with 1, 2 or 3.";
const HANDOFF: &str = "Now wait a moment for the quantum computer to take its turn";

/// Number of marbles a player takes: 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct Move(u8);

impl Move {
    /// All valid moves in ascending order.
    pub const ALL: [Move; 3] = [Move(1), Move(2), Move(3)];

    /// Returns the number of marbles.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Picks a move uniformly at random.
    pub fn random(rng: &mut impl Rng) -> Self {
        Move(rng.gen_range(1..=3))
    }
}

impl TryFrom<i64> for Move {
    type Error = MoveError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Move(value as u8)),
            _ => Err(MoveError::OutOfRange { value }),
        }
    }
}

impl FromStr for Move {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value: i64 = s.parse().map_err(|_| MoveError::NotANumber {
            input: s.to_string(),
        })?;
        Move::try_from(value)
    }
}

/// Why a reply was not accepted as a move.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum MoveError {
    /// The reply is not a plain integer.
    #[display("{input:?} is not a whole number")]
    NotANumber {
        /// The text after the mention.
        input: String,
    },
    /// The reply is an integer other than 1, 2 or 3.
    #[display("{value} is not 1, 2 or 3")]
    OutOfRange {
        /// The parsed value.
        value: i64,
    },
}

/// Parses the move in a reply, ignoring a leading `@account` mention.
///
/// The mention match is case-insensitive. Text without the mention is parsed
/// as a whole.
pub fn parse_reply(account: &str, text: &str) -> Result<Move, MoveError> {
    strip_mention(account, text).parse()
}

fn strip_mention<'a>(account: &str, text: &'a str) -> &'a str {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix('@') else {
        return text;
    };
    match rest.get(..account.len()) {
        Some(handle) if handle.eq_ignore_ascii_case(account) => {
            let after = &rest[account.len()..];
            // "@marbles2" names another account, not ours.
            if after.is_empty() || after.starts_with(char::is_whitespace) {
                after
            } else {
                text
            }
        }
        _ => text,
    }
}

/// Timing for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct TurnSettings {
    /// How long to wait for a valid reply before choosing at random.
    max_wait: Duration,
    /// Pause between reply queries.
    poll_interval: Duration,
    /// Ceiling on a single reply query.
    query_timeout: Duration,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// How a turn was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct TurnOutcome {
    /// The chosen move.
    value: Move,
    /// Handle of the player whose reply was accepted, or [`RANDOM_AUTHOR`].
    author: String,
    /// Identifier of the acknowledgment, the new thread anchor.
    anchor: MessageId,
    /// Counter to use for the next message.
    counter: u64,
}

impl TurnOutcome {
    /// Returns `true` if nobody replied in time and the move was random.
    pub fn is_random(&self) -> bool {
        self.author == RANDOM_AUTHOR
    }
}

/// Runs one turn.
///
/// Publishes `narrative` plus the move instructions as message `counter`,
/// replying to `anchor`. Then it polls for replies until one parses to a valid
/// move or `max_wait` elapses. Invalid replies get a correction and polling
/// continues. Finally it publishes an acknowledgment of the chosen move as a
/// reply to the prompt.
///
/// # Errors
///
/// Only the prompt and acknowledgment publishes can fail the turn. Failures
/// while polling are logged and retried on the next cycle.
#[instrument(skip(platform, narrative, settings), fields(account = %platform.account()))]
pub async fn resolve_turn(
    platform: &dyn Platform,
    narrative: &str,
    anchor: Option<&MessageId>,
    counter: u64,
    settings: &TurnSettings,
) -> Result<TurnOutcome, PlatformError> {
    let prompt_text = numbered(counter, &format!("{}{}", narrative, PROMPT_SUFFIX));
    let prompt = platform
        .publish(&Post::new(prompt_text).in_reply_to_opt(anchor))
        .await?;
    let counter = counter + 1;
    info!(prompt = %prompt.id(), "Prompt published, waiting for replies");

    let (value, author, text) = match poll_for_move(platform, prompt.id(), settings).await {
        Some((value, author)) => {
            let text = format!(
                "As suggested by @{}, {} marble{} will be taken.\n\n{}...",
                author,
                value,
                if value.value() == 1 { "" } else { "s" },
                HANDOFF
            );
            (value, author, text)
        }
        None => {
            let value = Move::random(&mut rand::thread_rng());
            info!(%value, "No valid reply in time, choosing at random");
            let text = format!(
                "Since no input has been given, a random value of {} has been chosen.\n\n{}",
                value, HANDOFF
            );
            (value, RANDOM_AUTHOR.to_string(), text)
        }
    };

    let acknowledgment = platform
        .publish(&Post::new(numbered(counter, &text)).in_reply_to(prompt.id().clone()))
        .await?;
    info!(%value, author = %author, anchor = %acknowledgment.id(), "Turn resolved");

    Ok(TurnOutcome {
        value,
        author,
        anchor: acknowledgment.id().clone(),
        counter: counter + 1,
    })
}

/// Polls for replies to `prompt` until a valid move arrives or time runs out.
async fn poll_for_move(
    platform: &dyn Platform,
    prompt: &MessageId,
    settings: &TurnSettings,
) -> Option<(Move, String)> {
    let account = platform.account();
    let started = Instant::now();
    let mut handled: HashSet<MessageId> = HashSet::new();
    let mut cycle: u64 = 0;

    while let Some(remaining) = settings.max_wait.checked_sub(started.elapsed()) {
        if remaining.is_zero() {
            break;
        }
        cycle += 1;

        let budget = settings.query_timeout.min(remaining);
        match timeout(budget, platform.replies_to(account, prompt)).await {
            Ok(Ok(replies)) => {
                debug!(cycle, count = replies.len(), "Fetched replies");
                for reply in replies {
                    if !handled.insert(reply.id().clone()) {
                        continue;
                    }
                    if reply.author().eq_ignore_ascii_case(account) {
                        debug!(id = %reply.id(), "Ignoring our own message");
                        continue;
                    }
                    match parse_reply(account, reply.text()) {
                        Ok(value) => {
                            info!(%value, author = %reply.author(), id = %reply.id(), "Accepted move");
                            return Some((value, reply.author().clone()));
                        }
                        Err(e) => reject(platform, &reply, &e).await,
                    }
                }
            }
            Ok(Err(e)) => warn!(cycle, error = %e, "Reply query failed, will retry"),
            Err(_) => warn!(cycle, ?budget, "Reply query timed out, will retry"),
        }

        let remaining = settings.max_wait.saturating_sub(started.elapsed());
        sleep(settings.poll_interval.min(remaining)).await;
    }

    debug!(cycles = cycle, "Wait elapsed without a valid move");
    None
}

/// Tells the author of an invalid reply to try again.
async fn reject(platform: &dyn Platform, reply: &Message, reason: &MoveError) {
    info!(author = %reply.author(), id = %reply.id(), %reason, "Rejecting invalid move");
    let notice = Post::new(format!(
        "@{} That isn't a valid move. Try again.",
        reply.author()
    ))
    .in_reply_to(reply.id().clone());

    if let Err(e) = platform.publish(&notice).await {
        warn!(error = %e, id = %reply.id(), "Failed to publish rejection notice");
    }
}
