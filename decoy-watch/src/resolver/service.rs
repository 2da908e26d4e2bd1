//! Most-recent-wins status resolution.

use std::sync::Arc;

use chat_feed::{ChatMessage, MessageSource, UserId};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::detection::{DecoyMessage, classify, is_server_candidate};
use crate::error::{Error, Result};
use crate::publisher::{NotificationPublisher, PublishOutcome};
use crate::status::{DecoyStatus, StatusStore};

/// Default number of messages fetched by a bulk scan.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;
/// Default window for the signal listing diagnostic.
pub const DEFAULT_SIGNAL_WINDOW: usize = 500;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub history_limit: usize,
    pub signal_window: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            signal_window: DEFAULT_SIGNAL_WINDOW,
        }
    }
}

/// Result of one resolve pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The store was written and the status published.
    Changed {
        status: DecoyStatus,
        signal_time: DateTime<Utc>,
        publish: PublishOutcome,
    },
    /// Nothing new; only the check time moved.
    Unchanged,
    /// The input carried no applicable signal.
    Ignored,
}

impl ResolveOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Turns feed messages into the current status.
///
/// Every entry point holds the same gate for its whole duration, so periodic,
/// forced and incremental passes never interleave.
pub struct Resolver {
    store: Arc<StatusStore>,
    source: Arc<dyn MessageSource>,
    publisher: Arc<NotificationPublisher>,
    config: ResolverConfig,
    own_id: OnceCell<UserId>,
    gate: Mutex<()>,
}

impl Resolver {
    pub fn new(
        store: Arc<StatusStore>,
        source: Arc<dyn MessageSource>,
        publisher: Arc<NotificationPublisher>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            config,
            own_id: OnceCell::new(),
            gate: Mutex::new(()),
        }
    }

    /// Fetch recent history and resolve it.
    ///
    /// A fetch failure marks the feed offline and is returned so the caller
    /// can back off.
    pub async fn scan(&self, forced: bool) -> Result<ResolveOutcome> {
        let _guard = self.gate.lock().await;

        let messages = self.fetch_history(self.config.history_limit).await?;
        self.store.set_live(true);
        debug!(count = messages.len(), forced, "Fetched history for scan");

        self.resolve_batch_locked(&messages, forced).await
    }

    /// Resolve an already fetched batch of messages.
    pub async fn resolve_batch(
        &self,
        messages: &[ChatMessage],
        forced: bool,
    ) -> Result<ResolveOutcome> {
        let _guard = self.gate.lock().await;
        self.resolve_batch_locked(messages, forced).await
    }

    /// Apply a single live message if it is a newer signal.
    ///
    /// Never looks at history.
    pub async fn resolve_one(&self, message: &ChatMessage) -> Result<ResolveOutcome> {
        let _guard = self.gate.lock().await;

        let own_id = self.own_id().await?;
        if message.is_authored_by(own_id) {
            return Ok(ResolveOutcome::Ignored);
        }
        let Some(status) = classify(&message.content).status() else {
            return Ok(ResolveOutcome::Ignored);
        };

        let current = self.store.fact();
        if current
            .last_signal_time
            .is_some_and(|last| message.timestamp <= last)
        {
            debug!(
                message_id = %message.id,
                signal_time = %message.timestamp,
                "Ignoring signal older than the current status"
            );
            return Ok(ResolveOutcome::Ignored);
        }

        info!(
            status = %status,
            signal_time = %message.timestamp,
            message_id = %message.id,
            "Live decoy signal"
        );
        Ok(self.apply(status, message.timestamp).await)
    }

    /// All signals in the last `signal_window` messages, most recent first.
    pub async fn collect_signals(&self) -> Result<Vec<DecoyMessage>> {
        let messages = self.fetch_history(self.config.signal_window).await?;
        let own_id = self.own_id().await?;

        let mut candidates = candidates(&messages, own_id);
        candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(candidates)
    }

    /// Messages in the last `window` that look like server output.
    pub async fn server_messages(&self, window: usize, max: usize) -> Result<Vec<ChatMessage>> {
        let mut messages = self.fetch_history(window).await?;
        let own_id = self.own_id().await?;

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(messages
            .into_iter()
            .filter(|m| !m.is_authored_by(own_id))
            .filter(|m| is_server_candidate(&m.author_name, &m.content))
            .take(max)
            .collect())
    }

    async fn resolve_batch_locked(
        &self,
        messages: &[ChatMessage],
        forced: bool,
    ) -> Result<ResolveOutcome> {
        let own_id = self.own_id().await?;
        let candidates = candidates(messages, own_id);
        let current = self.store.fact();

        // Ties on timestamp go to the last candidate in iteration order.
        let Some(latest) = candidates.iter().max_by_key(|c| c.timestamp) else {
            if current.status != DecoyStatus::Off || forced {
                info!(
                    previous = %current.status,
                    forced,
                    "No decoy signals in scan window, status is OFF"
                );
                return Ok(self.apply(DecoyStatus::Off, Utc::now()).await);
            }
            debug!(scanned = messages.len(), "No decoy signals in scan window");
            self.store.touch();
            return Ok(ResolveOutcome::Unchanged);
        };

        let changed = current.status != latest.status
            || current.last_signal_time != Some(latest.timestamp)
            || forced;

        if !changed {
            debug!(
                status = %current.status,
                candidates = candidates.len(),
                "Status unchanged"
            );
            self.store.touch();
            return Ok(ResolveOutcome::Unchanged);
        }

        info!(
            previous = %current.status,
            status = %latest.status,
            signal_time = %latest.timestamp,
            candidates = candidates.len(),
            forced,
            "Decoy status resolved"
        );
        Ok(self.apply(latest.status, latest.timestamp).await)
    }

    async fn apply(&self, status: DecoyStatus, signal_time: DateTime<Utc>) -> ResolveOutcome {
        self.store.write(status, signal_time);
        let publish = self.publisher.publish().await;
        ResolveOutcome::Changed {
            status,
            signal_time,
            publish,
        }
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        match self.source.fetch_history(limit).await {
            Ok(messages) => Ok(messages),
            Err(e) => {
                warn!(error = %e, "Failed to fetch channel history");
                self.store.set_live(false);
                Err(Error::FeedUnavailable(e))
            }
        }
    }

    async fn own_id(&self) -> Result<UserId> {
        self.own_id
            .get_or_try_init(|| async {
                let id = self.source.identity().await.map_err(|e| {
                    self.store.set_live(false);
                    Error::FeedUnavailable(e)
                })?;
                self.store.set_live(true);
                Ok::<_, Error>(id)
            })
            .await
            .copied()
    }
}

fn candidates(messages: &[ChatMessage], own_id: UserId) -> Vec<DecoyMessage> {
    messages
        .iter()
        .filter(|m| !m.is_authored_by(own_id))
        .filter_map(|m| {
            classify(&m.content).status().map(|status| DecoyMessage {
                text: m.content.clone(),
                timestamp: m.timestamp,
                status,
            })
        })
        .collect()
}
