//! Canonical status message lifecycle.

use std::sync::Arc;

use chat_feed::{ChatFeedError, MessageId, NotificationSink};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::publisher::format::{STATUS_TAG, render_status};
use crate::status::StatusStore;

/// Default number of own messages inspected by cleanup.
pub const DEFAULT_CLEANUP_SCAN_LIMIT: usize = 50;
/// Default number of status messages left after cleanup.
pub const DEFAULT_STATUS_RETENTION: usize = 1;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub cleanup_scan_limit: usize,
    pub retention: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            cleanup_scan_limit: DEFAULT_CLEANUP_SCAN_LIMIT,
            retention: DEFAULT_STATUS_RETENTION,
        }
    }
}

/// What a publish did to the canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The existing message was edited in place.
    Edited(MessageId),
    /// A new message was posted and became canonical.
    Created(MessageId),
    /// Nothing could be written; the handle is absent.
    Failed,
}

/// Result of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub kept: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Why an in-place edit was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditFailure {
    Deleted,
    Forbidden,
    Other,
}

impl EditFailure {
    fn classify(error: &ChatFeedError) -> Self {
        if error.is_not_found() {
            Self::Deleted
        } else if error.is_forbidden() {
            Self::Forbidden
        } else {
            Self::Other
        }
    }
}

/// Keeps exactly one visible status message in the output channel.
///
/// Handle transitions:
///
/// | handle  | event                | action                         |
/// |---------|----------------------|--------------------------------|
/// | absent  | publish              | send, store handle, cleanup    |
/// | present | edit succeeds        | keep handle                    |
/// | present | edit fails (any)     | clear handle, send, cleanup    |
/// | any     | send fails           | log, handle stays absent       |
pub struct NotificationPublisher {
    store: Arc<StatusStore>,
    sink: Arc<dyn NotificationSink>,
    config: PublisherConfig,
    gate: Mutex<()>,
}

impl NotificationPublisher {
    pub fn new(
        store: Arc<StatusStore>,
        sink: Arc<dyn NotificationSink>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config,
            gate: Mutex::new(()),
        }
    }

    /// Render the current fact into the canonical message.
    ///
    /// Never fails; sink errors are handled by the transition table and
    /// reported through the outcome.
    pub async fn publish(&self) -> PublishOutcome {
        let _guard = self.gate.lock().await;

        let fact = self.store.fact();
        let body = render_status(&fact);

        if let Some(handle) = self.store.notification_handle() {
            match self.sink.edit(handle, &body).await {
                Ok(()) => {
                    debug!(handle = %handle, status = %fact.status, "Updated status message");
                    return PublishOutcome::Edited(handle);
                }
                Err(e) => {
                    match EditFailure::classify(&e) {
                        EditFailure::Deleted => {
                            warn!(handle = %handle, "Status message was deleted, creating a new one")
                        }
                        EditFailure::Forbidden => {
                            warn!(handle = %handle, "No permission to edit status message, creating a new one")
                        }
                        EditFailure::Other => {
                            warn!(handle = %handle, error = %e, "Failed to edit status message, creating a new one")
                        }
                    }
                    self.store.set_notification_handle(None);
                }
            }
        }

        match self.sink.send(&body).await {
            Ok(id) => {
                self.store.set_notification_handle(Some(id));
                info!(handle = %id, status = %fact.status, "Created status message");
                self.cleanup_locked().await;
                PublishOutcome::Created(id)
            }
            Err(e) => {
                error!(error = %e, status = %fact.status, "Failed to create status message");
                PublishOutcome::Failed
            }
        }
    }

    /// Delete stale status messages, keeping the most recent ones.
    pub async fn cleanup(&self) -> CleanupReport {
        let _guard = self.gate.lock().await;
        self.cleanup_locked().await
    }

    /// Post a one-off message into the output channel.
    pub async fn announce(&self, text: &str) -> Result<MessageId> {
        self.sink.send(text).await.map_err(Error::Sink)
    }

    async fn cleanup_locked(&self) -> CleanupReport {
        let own = match self
            .sink
            .fetch_recent_own(self.config.cleanup_scan_limit)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Failed to list status messages for cleanup");
                return CleanupReport::default();
            }
        };

        let mut status_messages: Vec<_> = own
            .into_iter()
            .filter(|m| m.content.contains(STATUS_TAG))
            .collect();
        status_messages.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));

        let handle = self.store.notification_handle();
        let mut keep: Vec<MessageId> = Vec::with_capacity(self.config.retention + 1);
        if let Some(handle) = handle
            && status_messages.iter().any(|m| m.id == handle)
        {
            keep.push(handle);
        }
        for message in &status_messages {
            if keep.len() >= self.config.retention {
                break;
            }
            if !keep.contains(&message.id) {
                keep.push(message.id);
            }
        }

        let mut report = CleanupReport {
            kept: keep.len(),
            ..Default::default()
        };
        for message in status_messages.iter().filter(|m| !keep.contains(&m.id)) {
            match self.sink.delete(message.id).await {
                Ok(()) => {
                    debug!(message_id = %message.id, "Deleted old status message");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "Failed to delete old status message");
                    report.failed += 1;
                }
            }
        }

        if report.deleted > 0 || report.failed > 0 {
            info!(
                kept = report.kept,
                deleted = report.deleted,
                failed = report.failed,
                "Status message cleanup finished"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::DecoyStatus;
    use crate::testing::FakeSink;
    use chrono::{TimeZone, Utc};

    fn setup(retention: usize) -> (Arc<StatusStore>, Arc<FakeSink>, NotificationPublisher) {
        let store = Arc::new(StatusStore::new(5));
        let sink = Arc::new(FakeSink::new());
        let publisher = NotificationPublisher::new(
            store.clone(),
            sink.clone(),
            PublisherConfig {
                retention,
                ..Default::default()
            },
        );
        (store, sink, publisher)
    }

    #[tokio::test]
    async fn test_first_publish_creates() {
        let (store, sink, publisher) = setup(1);

        let outcome = publisher.publish().await;
        let PublishOutcome::Created(id) = outcome else {
            panic!("expected a new message, got {:?}", outcome);
        };
        assert_eq!(store.notification_handle(), Some(id));
        assert_eq!(sink.sends(), 1);
        assert_eq!(
            sink.content(id).unwrap(),
            "🟢 **DECOY STATUS: OFF**\n*No recent decoy activity detected*"
        );
    }

    #[tokio::test]
    async fn test_second_publish_edits() {
        let (store, sink, publisher) = setup(1);
        let id = match publisher.publish().await {
            PublishOutcome::Created(id) => id,
            other => panic!("unexpected {:?}", other),
        };

        store.write(
            DecoyStatus::On,
            Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap(),
        );
        assert_eq!(publisher.publish().await, PublishOutcome::Edited(id));
        assert_eq!(sink.sends(), 1);
        assert_eq!(sink.edits(), 1);
        assert!(sink.content(id).unwrap().starts_with("@everyone\n🔴"));
    }

    #[tokio::test]
    async fn test_edit_not_found_recreates() {
        let (store, sink, publisher) = setup(1);
        let old = match publisher.publish().await {
            PublishOutcome::Created(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        sink.remove(old);

        let outcome = publisher.publish().await;
        let PublishOutcome::Created(new) = outcome else {
            panic!("expected recreate, got {:?}", outcome);
        };
        assert_ne!(new, old);
        assert_eq!(store.notification_handle(), Some(new));
        assert_eq!(sink.sends(), 2);
    }

    #[tokio::test]
    async fn test_edit_forbidden_recreates() {
        let (store, sink, publisher) = setup(1);
        publisher.publish().await;
        sink.fail_edits_with(|| ChatFeedError::Forbidden("Missing Permissions".into()));

        let outcome = publisher.publish().await;
        assert!(matches!(outcome, PublishOutcome::Created(_)));
        assert_eq!(sink.sends(), 2);
        assert_eq!(store.notification_handle(), sink.last_sent());
    }

    #[tokio::test]
    async fn test_send_failure_leaves_handle_absent() {
        let (store, sink, publisher) = setup(1);
        sink.fail_sends(true);

        assert_eq!(publisher.publish().await, PublishOutcome::Failed);
        assert!(store.notification_handle().is_none());

        sink.fail_sends(false);
        assert!(matches!(
            publisher.publish().await,
            PublishOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_keeps_retention() {
        let (store, sink, publisher) = setup(1);
        for minute in 0..4 {
            sink.seed_own(
                "🟢 **DECOY STATUS: OFF**",
                Utc.with_ymd_and_hms(2025, 9, 1, 9, minute, 0).unwrap(),
            );
        }
        sink.seed_own(
            "unrelated chatter",
            Utc.with_ymd_and_hms(2025, 9, 1, 9, 30, 0).unwrap(),
        );

        let outcome = publisher.publish().await;
        let PublishOutcome::Created(id) = outcome else {
            panic!("expected create, got {:?}", outcome);
        };

        let remaining = sink.own_with_tag(STATUS_TAG);
        assert_eq!(remaining, vec![id]);
        assert_eq!(store.notification_handle(), Some(id));
        assert_eq!(sink.deletes(), 4);
        // Non-status messages are left alone.
        assert_eq!(sink.own_count(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_always_keeps_handle() {
        let (store, sink, publisher) = setup(2);
        let handle = sink.seed_own(
            "🟢 **DECOY STATUS: OFF**",
            Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap(),
        );
        store.set_notification_handle(Some(handle));
        for minute in 0..3 {
            sink.seed_own(
                "🔴 **DECOY STATUS: ON**",
                Utc.with_ymd_and_hms(2025, 9, 1, 9, minute, 0).unwrap(),
            );
        }

        let report = publisher.cleanup().await;
        assert_eq!(report.kept, 2);
        assert_eq!(report.deleted, 2);

        let remaining = sink.own_with_tag(STATUS_TAG);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&handle));
    }

    #[tokio::test]
    async fn test_cleanup_delete_failure_is_counted() {
        let (_store, sink, publisher) = setup(1);
        for minute in 0..3 {
            sink.seed_own(
                "🟢 **DECOY STATUS: OFF**",
                Utc.with_ymd_and_hms(2025, 9, 1, 9, minute, 0).unwrap(),
            );
        }
        sink.fail_deletes(true);

        let report = publisher.cleanup().await;
        assert_eq!(
            report,
            CleanupReport {
                kept: 1,
                deleted: 0,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_announce() {
        let (_store, sink, publisher) = setup(1);
        let id = publisher.announce("hello").await.unwrap();
        assert_eq!(sink.content(id).as_deref(), Some("hello"));

        sink.fail_sends(true);
        assert!(matches!(
            publisher.announce("again").await,
            Err(Error::Sink(_))
        ));
    }
}
