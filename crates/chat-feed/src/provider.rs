//! Message source and notification sink traits.
//!
//! A watcher reads from a [`MessageSource`] and publishes into a
//! [`NotificationSink`]. Both are implemented by
//! [`DiscordChannel`](crate::DiscordChannel); tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{ChatMessage, MessageId, UserId};

/// Read side of a chat channel.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Resolve the identity this source is authenticated as.
    ///
    /// A successful call confirms the connection is working.
    async fn identity(&self) -> Result<UserId>;

    /// Fetch up to `limit` of the most recent messages.
    ///
    /// Order is unspecified; callers must sort if they care.
    async fn fetch_history(&self, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Fetch up to `limit` messages posted after `after`, oldest first.
    async fn fetch_after(&self, after: MessageId, limit: usize) -> Result<Vec<ChatMessage>>;
}

/// Write side of a chat channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post a new message and return its handle.
    async fn send(&self, content: &str) -> Result<MessageId>;

    /// Replace the content of an existing message in place.
    ///
    /// Fails with [`ChatFeedError::NotFound`](crate::ChatFeedError::NotFound)
    /// when the message was deleted and with
    /// [`ChatFeedError::Forbidden`](crate::ChatFeedError::Forbidden) when the
    /// credential may not edit it.
    async fn edit(&self, id: MessageId, content: &str) -> Result<()>;

    /// Delete a message.
    async fn delete(&self, id: MessageId) -> Result<()>;

    /// Fetch up to `limit` recent messages authored by this sink's identity,
    /// most recent first.
    async fn fetch_recent_own(&self, limit: usize) -> Result<Vec<ChatMessage>>;
}
