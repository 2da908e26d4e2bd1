//! In-memory message source and notification sink for tests.

use std::time::Duration;

use async_trait::async_trait;
use chat_feed::{
    ChannelId, ChatFeedError, ChatMessage, MessageId, MessageSource, NotificationSink, UserId,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Identity both fakes are authenticated as.
pub const SELF_ID: UserId = UserId(900);
/// Author used for game server messages.
pub const SERVER_ID: UserId = UserId(7);
pub const TARGET_CHANNEL: ChannelId = ChannelId(1);
pub const OUTPUT_CHANNEL: ChannelId = ChannelId(2);

/// Error factory; `ChatFeedError` is not `Clone`.
pub type ErrorFn = fn() -> ChatFeedError;

fn unavailable() -> ChatFeedError {
    ChatFeedError::Api {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[derive(Default)]
struct SourceState {
    next_id: u64,
    messages: Vec<ChatMessage>,
    fetch_error: Option<ErrorFn>,
    identity_error: Option<ErrorFn>,
    fetch_calls: usize,
    identity_calls: usize,
}

/// A target channel held in memory.
pub struct FakeSource {
    state: Mutex<SourceState>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SourceState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    /// Append a message; ids grow with insertion order, timestamps are as given.
    pub fn push(
        &self,
        author: UserId,
        author_name: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> MessageId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = MessageId(state.next_id);
        state.messages.push(
            ChatMessage::new(id, TARGET_CHANNEL, author, author_name, content)
                .with_timestamp(timestamp),
        );
        id
    }

    pub fn server_says(&self, content: &str, timestamp: DateTime<Utc>) -> MessageId {
        self.push(SERVER_ID, "Server", content, timestamp)
    }

    pub fn message(&self, id: MessageId) -> Option<ChatMessage> {
        self.state.lock().messages.iter().find(|m| m.id == id).cloned()
    }

    /// Make every fetch fail with `Api 503`.
    pub fn fail_fetches(&self, fail: bool) {
        self.state.lock().fetch_error = fail.then_some(unavailable as ErrorFn);
    }

    pub fn fail_fetches_with(&self, error: ErrorFn) {
        self.state.lock().fetch_error = Some(error);
    }

    pub fn fail_identity_with(&self, error: Option<ErrorFn>) {
        self.state.lock().identity_error = error;
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().fetch_calls
    }

    pub fn identity_calls(&self) -> usize {
        self.state.lock().identity_calls
    }
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    async fn identity(&self) -> chat_feed::Result<UserId> {
        let mut state = self.state.lock();
        state.identity_calls += 1;
        match state.identity_error {
            Some(error) => Err(error()),
            None => Ok(SELF_ID),
        }
    }

    async fn fetch_history(&self, limit: usize) -> chat_feed::Result<Vec<ChatMessage>> {
        let mut state = self.state.lock();
        state.fetch_calls += 1;
        if let Some(error) = state.fetch_error {
            return Err(error());
        }
        let mut newest: Vec<ChatMessage> = state.messages.clone();
        newest.sort_by(|a, b| b.id.cmp(&a.id));
        newest.truncate(limit);
        Ok(newest)
    }

    async fn fetch_after(
        &self,
        after: MessageId,
        limit: usize,
    ) -> chat_feed::Result<Vec<ChatMessage>> {
        let mut state = self.state.lock();
        state.fetch_calls += 1;
        if let Some(error) = state.fetch_error {
            return Err(error());
        }
        let mut newer: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.id > after)
            .cloned()
            .collect();
        newer.sort_by_key(|m| m.id);
        newer.truncate(limit);
        Ok(newer)
    }
}

#[derive(Default)]
struct SinkState {
    next_id: u64,
    messages: Vec<ChatMessage>,
    last_sent: Option<MessageId>,
    sends: usize,
    edits: usize,
    deletes: usize,
    fail_sends: bool,
    fail_deletes: bool,
    edit_error: Option<ErrorFn>,
    send_delay: Option<Duration>,
}

/// An output channel held in memory. Every message in it is ours.
pub struct FakeSink {
    state: Mutex<SinkState>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SinkState {
                next_id: 5000,
                ..Default::default()
            }),
        }
    }

    /// Place an existing own message in the channel without counting a send.
    pub fn seed_own(&self, content: &str, timestamp: DateTime<Utc>) -> MessageId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = MessageId(state.next_id);
        state.messages.push(
            ChatMessage::new(id, OUTPUT_CHANNEL, SELF_ID, "watcher", content)
                .with_timestamp(timestamp),
        );
        id
    }

    /// Delete a message out from under the publisher.
    pub fn remove(&self, id: MessageId) {
        self.state.lock().messages.retain(|m| m.id != id);
    }

    pub fn content(&self, id: MessageId) -> Option<String> {
        self.state
            .lock()
            .messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.content.clone())
    }

    /// Ids of messages containing `tag`, most recent first.
    pub fn own_with_tag(&self, tag: &str) -> Vec<MessageId> {
        let state = self.state.lock();
        let mut tagged: Vec<&ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.content.contains(tag))
            .collect();
        tagged.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        tagged.into_iter().map(|m| m.id).collect()
    }

    pub fn own_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Contents of every message still in the channel, oldest first.
    pub fn contents(&self) -> Vec<String> {
        self.state
            .lock()
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn last_sent(&self) -> Option<MessageId> {
        self.state.lock().last_sent
    }

    pub fn sends(&self) -> usize {
        self.state.lock().sends
    }

    pub fn edits(&self) -> usize {
        self.state.lock().edits
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().deletes
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().fail_deletes = fail;
    }

    /// Make every send sleep before it lands.
    pub fn delay_sends(&self, delay: Duration) {
        self.state.lock().send_delay = Some(delay);
    }

    /// Make every edit fail with the given error.
    pub fn fail_edits_with(&self, error: ErrorFn) {
        self.state.lock().edit_error = Some(error);
    }
}

impl Default for FakeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for FakeSink {
    async fn send(&self, content: &str) -> chat_feed::Result<MessageId> {
        let delay = self.state.lock().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(unavailable());
        }
        state.next_id += 1;
        state.sends += 1;
        let id = MessageId(state.next_id);
        state
            .messages
            .push(ChatMessage::new(id, OUTPUT_CHANNEL, SELF_ID, "watcher", content));
        state.last_sent = Some(id);
        Ok(id)
    }

    async fn edit(&self, id: MessageId, content: &str) -> chat_feed::Result<()> {
        let mut state = self.state.lock();
        if let Some(error) = state.edit_error {
            return Err(error());
        }
        let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
            return Err(ChatFeedError::NotFound("Unknown Message".to_string()));
        };
        message.content = content.to_string();
        state.edits += 1;
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> chat_feed::Result<()> {
        let mut state = self.state.lock();
        if state.fail_deletes {
            return Err(unavailable());
        }
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        if state.messages.len() == before {
            return Err(ChatFeedError::NotFound("Unknown Message".to_string()));
        }
        state.deletes += 1;
        Ok(())
    }

    async fn fetch_recent_own(&self, limit: usize) -> chat_feed::Result<Vec<ChatMessage>> {
        let state = self.state.lock();
        let mut own = state.messages.clone();
        own.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        own.truncate(limit);
        Ok(own)
    }
}
