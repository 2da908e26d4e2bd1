//! Live feed polling.

use std::sync::Arc;
use std::time::Duration;

use chat_feed::{ChatMessage, MessageId, MessageSource, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::CommandHandler;
use crate::error::{Error, Result};
use crate::listener::PollBackoff;
use crate::resolver::Resolver;
use crate::status::StatusStore;

/// Default live poll period in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
/// Messages requested per poll.
const POLL_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub poll_interval: Duration,
    pub batch_limit: usize,
    pub backoff: PollBackoff,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_limit: POLL_BATCH_LIMIT,
            backoff: PollBackoff::default(),
        }
    }
}

/// Follows the target channel and feeds each new message to the resolver
/// and the command surface.
pub struct LiveListener {
    source: Arc<dyn MessageSource>,
    store: Arc<StatusStore>,
    resolver: Arc<Resolver>,
    commands: Arc<CommandHandler>,
    config: ListenerConfig,
}

impl LiveListener {
    pub fn new(
        source: Arc<dyn MessageSource>,
        store: Arc<StatusStore>,
        resolver: Arc<Resolver>,
        commands: Arc<CommandHandler>,
        config: ListenerConfig,
    ) -> Self {
        Self {
            source,
            store,
            resolver,
            commands,
            config,
        }
    }

    /// Run until cancelled or the credential is rejected.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<()> {
        let Some(own_id) = self.connect(&cancel_token).await? else {
            return Ok(());
        };
        info!(user_id = %own_id, "Listening for decoy status messages");

        let Some(mut cursor) = self.seed_cursor(&cancel_token).await? else {
            return Ok(());
        };
        debug!(cursor = %cursor, "Live cursor seeded");

        let mut failures: u32 = 0;
        loop {
            let delay = if failures == 0 {
                self.config.poll_interval
            } else {
                self.config.backoff.delay_for_failures(failures)
            };

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            match self
                .source
                .fetch_after(cursor, self.config.batch_limit)
                .await
                .map_err(Error::FeedUnavailable)
            {
                Ok(messages) => {
                    if failures > 0 {
                        info!(failures, "Live feed recovered");
                    }
                    failures = 0;
                    self.store.set_live(true);
                    for message in messages {
                        cursor = cursor.max(message.id);
                        if message.is_authored_by(own_id) {
                            continue;
                        }
                        self.handle_message(&message).await;
                    }
                }
                Err(e) if e.is_fatal_feed_error() => {
                    error!(error = %e, "Live feed credential rejected, listener stopping");
                    self.store.set_live(false);
                    return Err(e);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.store.set_live(false);
                    warn!(error = %e, failures, "Live feed poll failed");
                }
            }
        }

        info!("Live listener stopped");
        Ok(())
    }

    async fn handle_message(&self, message: &ChatMessage) {
        if let Err(e) = self.resolver.resolve_one(message).await {
            warn!(message_id = %message.id, error = %e, "Failed to resolve live message");
        }
        match self.commands.dispatch(message).await {
            Ok(_) => {}
            Err(Error::Validation(reason)) => {
                warn!(message_id = %message.id, %reason, "Rejected command");
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Command failed");
            }
        }
    }

    /// Resolve our identity, retrying transient failures.
    ///
    /// Returns `None` if cancelled first.
    async fn connect(&self, cancel_token: &CancellationToken) -> Result<Option<UserId>> {
        let mut failures: u32 = 0;
        loop {
            match self.source.identity().await.map_err(Error::FeedUnavailable) {
                Ok(id) => {
                    self.store.set_live(true);
                    return Ok(Some(id));
                }
                Err(e) if e.is_fatal_feed_error() => {
                    error!(error = %e, "Login failed");
                    self.store.set_live(false);
                    return Err(e);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.store.set_live(false);
                    let delay = self.config.backoff.delay_for_failures(failures);
                    warn!(error = %e, failures, "Identity lookup failed, retrying");
                    tokio::select! {
                        biased;
                        _ = cancel_token.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Find the newest existing message so history is not replayed.
    async fn seed_cursor(&self, cancel_token: &CancellationToken) -> Result<Option<MessageId>> {
        let mut failures: u32 = 0;
        loop {
            match self
                .source
                .fetch_history(1)
                .await
                .map_err(Error::FeedUnavailable)
            {
                Ok(messages) => {
                    let newest = messages.iter().map(|m| m.id).max();
                    return Ok(Some(newest.unwrap_or(MessageId(0))));
                }
                Err(e) if e.is_fatal_feed_error() => {
                    self.store.set_live(false);
                    return Err(e);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.store.set_live(false);
                    warn!(error = %e, failures, "Failed to read channel head, retrying");
                    tokio::select! {
                        biased;
                        _ = cancel_token.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(self.config.backoff.delay_for_failures(failures)) => {}
                    }
                }
            }
        }
    }
}
