//! Networked destination: the platform's HTTPS API with OAuth 1.0a user context.

use super::oauth::{OAuthSigner, encode};
use super::{Message, MessageId, Platform, PlatformError, PlatformErrorKind, Post};
use crate::AccountConfig;
use reqwest::Method;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const API_BASE: &str = "https://api.twitter.com";
const UPLOAD_BASE: &str = "https://upload.twitter.com";

/// Page size for reply searches (the platform maximum).
const SEARCH_PAGE_SIZE: &str = "100";

/// Upper bound on pages followed per reply query.
const MAX_SEARCH_PAGES: usize = 10;

/// Per-request ceiling applied by the HTTP client itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct UserData {
    username: String,
}

#[derive(Debug, Deserialize)]
struct MediaUpload {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<SearchTweet>,
    #[serde(default)]
    includes: SearchIncludes,
    #[serde(default)]
    meta: SearchMeta,
}

#[derive(Debug, Deserialize)]
struct SearchTweet {
    id: String,
    text: String,
    author_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchIncludes {
    #[serde(default)]
    users: Vec<SearchUser>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    id: String,
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

impl SearchPage {
    /// Converts the page into messages, resolving author ids to handles.
    fn into_messages(self) -> Vec<Message> {
        let users = self.includes.users;
        self.data
            .into_iter()
            .map(|tweet| {
                let author = tweet
                    .author_id
                    .as_deref()
                    .and_then(|id| users.iter().find(|u| u.id == id))
                    .map(|u| u.username.clone())
                    .or(tweet.author_id)
                    .unwrap_or_default();
                Message::new(tweet.id.into(), author, tweet.text)
            })
            .collect()
    }
}

/// Sorts messages oldest first. Ids are decimal snowflakes, so a shorter id is
/// always older and equal-length ids compare lexically.
fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        let (a, b) = (a.id().as_str(), b.id().as_str());
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    });
}

/// Authenticated client for the platform's REST API.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    signer: OAuthSigner,
    account: String,
    api_base: String,
    upload_base: String,
}

impl TwitterClient {
    /// Creates a client without contacting the platform.
    #[instrument(skip(config), fields(account = %config.account()))]
    pub fn new(config: &AccountConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("marble_thread/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(config.credentials()),
            account: config.account().clone(),
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        })
    }

    /// Creates a client and verifies its credentials.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the credentials are rejected or the
    /// platform cannot be reached.
    #[instrument(skip(config), fields(account = %config.account()))]
    pub async fn connect(config: &AccountConfig) -> Result<Self, PlatformError> {
        let client = Self::new(config)?;
        let username = client.verify_credentials().await?;
        if !username.eq_ignore_ascii_case(&client.account) {
            warn!(
                configured = %client.account,
                authenticated = %username,
                "Authenticated handle differs from configured account"
            );
        }
        Ok(client)
    }

    /// Returns the handle of the authenticated user.
    #[instrument(skip(self))]
    pub async fn verify_credentials(&self) -> Result<String, PlatformError> {
        debug!("Verifying credentials");
        let url = format!("{}/2/users/me", self.api_base);
        let response = self.send(Method::GET, &url, &[], None).await?;
        let user: Envelope<UserData> = decode(&response)?;
        info!(username = %user.data.username, "Credentials verified");
        Ok(user.data.username)
    }

    /// Signs and sends one request, returning the body of a success response.
    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<String, PlatformError> {
        let authorization = self.signer.authorization(method.as_str(), url, query)?;

        let full_url = if query.is_empty() {
            url.to_string()
        } else {
            let query_string = query
                .iter()
                .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            format!("{}?{}", url, query_string)
        };

        let mut request = self
            .http
            .request(method, &full_url)
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Platform request failed");
            PlatformError::from(e)
        })?;
        read_success(response, url).await
    }

    /// Uploads an image and returns its media id.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_media(&self, path: &Path) -> Result<String, PlatformError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PlatformError::new(
                PlatformErrorKind::Media,
                format!("Failed to read image {}: {}", path.display(), e),
            )
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        debug!(size = bytes.len(), file_name = %file_name, "Uploading media");

        let url = format!("{}/1.1/media/upload.json", self.upload_base);
        let authorization = self.signer.authorization("POST", &url, &[])?;
        let form = reqwest::multipart::Form::new().part(
            "media",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await?;
        let body = read_success(response, &url).await?;
        let upload: MediaUpload = decode(&body)?;
        info!(media_id = %upload.media_id_string, "Media uploaded");
        Ok(upload.media_id_string)
    }
}

/// Reads the response body, turning non-success statuses into errors.
async fn read_success(response: reqwest::Response, url: &str) -> Result<String, PlatformError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| {
        error!(error = ?e, "Failed to read platform response");
        PlatformError::from(e)
    })?;

    if !status.is_success() {
        warn!(status = %status, url = %url, response = %text, "Platform API error");
        return Err(PlatformError::new(
            PlatformErrorKind::Api,
            format!("Platform API error {}: {}", status, text),
        ));
    }
    Ok(text)
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, PlatformError> {
    serde_json::from_str(body).map_err(|e| {
        PlatformError::new(
            PlatformErrorKind::Decode,
            format!("Failed to parse platform response: {}", e),
        )
    })
}

#[async_trait::async_trait]
impl Platform for TwitterClient {
    fn account(&self) -> &str {
        &self.account
    }

    #[instrument(skip(self, post), fields(reply_to = ?post.reply_to(), has_image = post.image().is_some()))]
    async fn publish(&self, post: &Post) -> Result<Message, PlatformError> {
        let mut body = serde_json::json!({ "text": post.text() });
        if let Some(parent) = post.reply_to() {
            body["reply"] = serde_json::json!({ "in_reply_to_tweet_id": parent.as_str() });
        }
        if let Some(image) = post.image() {
            let media_id = self.upload_media(image).await?;
            body["media"] = serde_json::json!({ "media_ids": [media_id] });
        }

        let url = format!("{}/2/tweets", self.api_base);
        let response = self.send(Method::POST, &url, &[], Some(body)).await?;
        let created: Envelope<CreatedTweet> = decode(&response)?;
        info!(id = %created.data.id, "Published message");

        Ok(Message::new(
            created.data.id.into(),
            self.account.clone(),
            created.data.text,
        ))
    }

    #[instrument(skip(self))]
    async fn replies_to(
        &self,
        account: &str,
        since: &MessageId,
    ) -> Result<Vec<Message>, PlatformError> {
        let url = format!("{}/2/tweets/search/recent", self.api_base);
        let search = format!("to:{}", account);
        let mut messages = Vec::new();
        let mut next_token: Option<String> = None;

        for page in 0..MAX_SEARCH_PAGES {
            let response = {
                let mut query = vec![
                    ("query", search.as_str()),
                    ("since_id", since.as_str()),
                    ("max_results", SEARCH_PAGE_SIZE),
                    ("expansions", "author_id"),
                    ("user.fields", "username"),
                ];
                if let Some(token) = next_token.as_deref() {
                    query.push(("next_token", token));
                }
                self.send(Method::GET, &url, &query, None).await?
            };
            let page_data: SearchPage = decode(&response)?;
            let token = page_data.meta.next_token.clone();
            messages.extend(page_data.into_messages());
            debug!(page, total = messages.len(), "Fetched reply page");

            match token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        sort_chronologically(&mut messages);
        Ok(messages)
    }
}
