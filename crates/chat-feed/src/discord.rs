//! Discord REST client.
//!
//! Implements Discord's recommended rate limit handling:
//! - No hardcoded rate limits
//! - Parses response headers (Retry-After, X-RateLimit-Reset-After)
//! - Retries on 429 responses up to a fixed budget
//!
//! One [`DiscordClient`] is shared by every [`DiscordChannel`] view, so the
//! authenticated identity is looked up once.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{ChatFeedError, Result};
use crate::message::{ChannelId, ChatMessage, MessageId, UserId};
use crate::provider::{MessageSource, NotificationSink};

/// Default REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Discord returns at most this many messages per history request.
const MAX_PAGE_SIZE: usize = 100;

/// Fallback wait when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Discord client configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Account token.
    pub token: String,
    /// Whether the token belongs to a bot application (`Bot ` prefix).
    pub bot: bool,
    /// REST base URL, without trailing slash.
    pub api_base: String,
    /// Per-request timeout; zero disables it.
    pub request_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            bot: false,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(15),
            user_agent: format!("chat-feed/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DiscordConfig {
    /// Create a config for the given token with default settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    fn authorization(&self) -> String {
        if self.bot {
            format!("Bot {}", self.token)
        } else {
            self.token.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: UserId,
    #[serde(default)]
    username: String,
}

/// The part of a created message the sink needs.
#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: MessageId,
    channel_id: ChannelId,
    author: RawUser,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
}

impl From<RawMessage> for ChatMessage {
    fn from(raw: RawMessage) -> Self {
        Self {
            id: raw.id,
            channel_id: raw.channel_id,
            author_id: raw.author.id,
            author_name: raw.author.username,
            content: raw.content,
            timestamp: raw.timestamp,
        }
    }
}

/// Discord REST client.
pub struct DiscordClient {
    config: DiscordConfig,
    http: Client,
    identity: OnceCell<UserId>,
}

impl DiscordClient {
    /// Create a new client.
    pub fn new(config: DiscordConfig) -> Result<Self> {
        install_rustls_provider();

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if config.request_timeout > Duration::ZERO {
            builder = builder.timeout(config.request_timeout);
        }

        Ok(Self {
            config,
            http: builder.build()?,
            identity: OnceCell::new(),
        })
    }

    /// Get a view of one channel backed by this client.
    pub fn channel(self: &Arc<Self>, channel_id: ChannelId) -> DiscordChannel {
        DiscordChannel {
            client: Arc::clone(self),
            channel_id,
        }
    }

    /// The user this client is authenticated as. Cached after the first success.
    pub async fn current_user(&self) -> Result<UserId> {
        self.identity
            .get_or_try_init(|| async {
                let user: RawUser = self
                    .request_json(Method::GET, "/users/@me", &[], None)
                    .await?;
                debug!(user_id = %user.id, username = %user.username, "Resolved Discord identity");
                Ok::<_, ChatFeedError>(user.id)
            })
            .await
            .copied()
    }

    /// Send request with rate limit handling.
    /// Retries on 429 responses respecting the Retry-After header.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        let mut retries = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(AUTHORIZATION, self.config.authorization());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(&response);

                if retries >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Discord rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(ChatFeedError::RateLimited { retries });
                }
                retries += 1;

                let wait_duration = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                debug!(
                    "Discord rate limited (429) on {} {}, waiting {:?} before retry ({}/{})",
                    method, path, wait_duration, retries, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => ChatFeedError::Unauthorized,
                StatusCode::FORBIDDEN => {
                    ChatFeedError::Forbidden(format!("{} {}: {}", method, path, body))
                }
                StatusCode::NOT_FOUND => {
                    ChatFeedError::NotFound(format!("{} {}: {}", method, path, body))
                }
                _ => ChatFeedError::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let response = self.request(method, path, query, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_messages(
        &self,
        channel_id: ChannelId,
        query: &[(&str, String)],
    ) -> Result<Vec<ChatMessage>> {
        let raw: Vec<RawMessage> = self
            .request_json(
                Method::GET,
                &format!("/channels/{}/messages", channel_id),
                query,
                None,
            )
            .await?;
        Ok(raw.into_iter().map(ChatMessage::from).collect())
    }

    /// Page backwards through a channel until `limit` messages are collected
    /// or the channel runs out. Newest first.
    async fn history(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::with_capacity(limit);
        let mut before: Option<MessageId> = None;

        while messages.len() < limit {
            let page_size = (limit - messages.len()).min(MAX_PAGE_SIZE);
            let mut query = vec![("limit", page_size.to_string())];
            if let Some(before) = before {
                query.push(("before", before.to_string()));
            }

            let page = self.get_messages(channel_id, &query).await?;
            let fetched = page.len();
            before = page.iter().map(|m| m.id).min();
            messages.extend(page);

            if fetched < page_size {
                break;
            }
        }

        Ok(messages)
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .filter_map(|value| value.to_str().ok()?.parse::<f64>().ok())
        .find(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn message_body(content: &str) -> Value {
    json!({
        "content": content,
        "allowed_mentions": { "parse": ["everyone"] }
    })
}

/// A single Discord channel, usable as source and sink.
#[derive(Clone)]
pub struct DiscordChannel {
    client: Arc<DiscordClient>,
    channel_id: ChannelId,
}

impl DiscordChannel {
    /// The channel this view reads from and writes to.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }
}

#[async_trait]
impl MessageSource for DiscordChannel {
    async fn identity(&self) -> Result<UserId> {
        self.client.current_user().await
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        self.client.history(self.channel_id, limit).await
    }

    async fn fetch_after(&self, after: MessageId, limit: usize) -> Result<Vec<ChatMessage>> {
        let query = [
            ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("after", after.to_string()),
        ];
        let mut messages = self.client.get_messages(self.channel_id, &query).await?;
        messages.sort_by_key(|m| m.id);
        Ok(messages)
    }
}

#[async_trait]
impl NotificationSink for DiscordChannel {
    async fn send(&self, content: &str) -> Result<MessageId> {
        let created: CreatedMessage = self
            .client
            .request_json(
                Method::POST,
                &format!("/channels/{}/messages", self.channel_id),
                &[],
                Some(&message_body(content)),
            )
            .await?;
        Ok(created.id)
    }

    async fn edit(&self, id: MessageId, content: &str) -> Result<()> {
        self.client
            .request(
                Method::PATCH,
                &format!("/channels/{}/messages/{}", self.channel_id, id),
                &[],
                Some(&message_body(content)),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> Result<()> {
        self.client
            .request(
                Method::DELETE,
                &format!("/channels/{}/messages/{}", self.channel_id, id),
                &[],
                None,
            )
            .await?;
        Ok(())
    }

    async fn fetch_recent_own(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        let me = self.client.current_user().await?;
        let mut own: Vec<ChatMessage> = self
            .client
            .history(self.channel_id, limit)
            .await?
            .into_iter()
            .filter(|m| m.is_authored_by(me))
            .collect();
        own.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(own)
    }
}
