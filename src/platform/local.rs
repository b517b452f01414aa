//! Offline stand-in destination that plays the platform from a terminal.

use super::{Message, MessageId, Platform, PlatformError, PlatformErrorKind, Post};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Author handle given to every reply typed at the console.
pub const LOCAL_AUTHOR: &str = "local_player";

/// Console stand-in bound to the process's stdin and stdout.
pub type StdioConsole = LocalConsole<BufReader<Stdin>, Stdout>;

/// Image viewer launched for attached images when none is configured.
pub fn default_viewer() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Platform stand-in that prints posts and reads replies as typed lines.
///
/// Every published message and every typed reply gets a fresh `local-<n>`
/// identifier. A query abandoned mid-line keeps what was typed so far; the
/// next query finishes that line.
#[derive(Debug)]
pub struct LocalConsole<R, W> {
    account: String,
    input: Mutex<R>,
    pending: Mutex<Vec<u8>>,
    output: Mutex<W>,
    viewer: Option<String>,
    next_id: AtomicU64,
}

impl StdioConsole {
    /// Creates a console stand-in on stdin/stdout using the default viewer.
    pub fn stdio(account: impl Into<String>) -> Self {
        LocalConsole::new(account, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .with_viewer(default_viewer())
    }
}

impl<R, W> LocalConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a console stand-in over arbitrary line input and output.
    ///
    /// Images are not displayed until a viewer is set with
    /// [`LocalConsole::with_viewer`].
    pub fn new(account: impl Into<String>, input: R, output: W) -> Self {
        Self {
            account: account.into(),
            input: Mutex::new(input),
            pending: Mutex::new(Vec::new()),
            output: Mutex::new(output),
            viewer: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Sets the external command used to display attached images.
    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    /// Consumes the console and returns its output sink.
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    fn mint_id(&self) -> MessageId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        MessageId::from(format!("local-{}", n))
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn show_image(&self, path: &Path) -> Result<(), PlatformError> {
        let Some(viewer) = &self.viewer else {
            debug!("No image viewer configured");
            return Ok(());
        };

        info!(viewer = %viewer, "Opening image");
        tokio::process::Command::new(viewer)
            .arg(path)
            .spawn()
            .map(|_child| ())
            .map_err(|e| {
                warn!(error = %e, viewer = %viewer, "Failed to launch image viewer");
                PlatformError::new(
                    PlatformErrorKind::Media,
                    format!("Failed to launch image viewer {}: {}", viewer, e),
                )
            })
    }
}

#[async_trait::async_trait]
impl<R, W> Platform for LocalConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn account(&self) -> &str {
        &self.account
    }

    #[instrument(skip(self, post), fields(reply_to = ?post.reply_to()))]
    async fn publish(&self, post: &Post) -> Result<Message, PlatformError> {
        if let Some(image) = post.image() {
            self.show_image(image).await?;
        }

        let rendered = match post.reply_to() {
            Some(parent) => format!("\n\nIn reply to {}\n{}\n", parent, post.text()),
            None => format!("\n\n{}\n", post.text()),
        };
        {
            let mut output = self.output.lock().await;
            output.write_all(rendered.as_bytes()).await?;
            output.flush().await?;
        }

        let id = self.mint_id();
        debug!(id = %id, "Printed message");
        Ok(Message::new(id, self.account.clone(), post.text().clone()))
    }

    #[instrument(skip(self))]
    async fn replies_to(
        &self,
        account: &str,
        _since: &MessageId,
    ) -> Result<Vec<Message>, PlatformError> {
        let mut input = self.input.lock().await;
        let mut pending = self.pending.lock().await;
        // read_until keeps partial bytes in `pending` if this future is dropped.
        let read = input.read_until(b'\n', &mut pending).await?;
        if read == 0 && pending.is_empty() {
            return Err(PlatformError::new(
                PlatformErrorKind::Console,
                "Console input closed",
            ));
        }

        let line = String::from_utf8_lossy(&pending).into_owned();
        pending.clear();
        let typed = line.trim_end_matches(['\r', '\n']);
        let id = self.mint_id();
        debug!(id = %id, typed = %typed, "Read console reply");
        Ok(vec![Message::new(
            id,
            LOCAL_AUTHOR.to_string(),
            format!("@{} {}", account, typed),
        )])
    }
}
