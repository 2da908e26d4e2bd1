//! Periodic and on-demand scan loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::resolver::{ResolveOutcome, Resolver};
use crate::status::StatusStore;

/// Configuration constants for the scheduler.
mod config {
    /// Sleep after a failed scan, in seconds.
    pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60;
    /// Pending forced scan requests.
    pub const COMMAND_CHANNEL_CAPACITY: usize = 16;
}

pub use config::DEFAULT_ERROR_BACKOFF_SECS;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fallback sleep after a failed scan. The effective backoff is never
    /// shorter than the current interval.
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(config::DEFAULT_ERROR_BACKOFF_SECS),
        }
    }
}

/// Requests accepted by a running scheduler.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Scan now and republish regardless of change.
    ForceScan {
        reply: Option<oneshot::Sender<Result<ResolveOutcome>>>,
    },
}

/// Cloneable handle for talking to a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Queue a forced scan without waiting for it.
    pub async fn force_scan(&self) -> Result<()> {
        self.tx
            .send(SchedulerCommand::ForceScan { reply: None })
            .await
            .map_err(|_| Error::Other("Scheduler is not running".to_string()))
    }

    /// Queue a forced scan and wait for its outcome.
    pub async fn force_scan_and_wait(&self) -> Result<ResolveOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::ForceScan {
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| Error::Other("Scheduler is not running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Other("Scheduler stopped before scanning".to_string()))?
    }
}

/// Drives [`Resolver::scan`] on a timer.
///
/// Scans once immediately, then every `interval` seconds as read from the
/// store when each scan starts. Forced scans run as soon as they arrive
/// and leave the periodic deadline where it was.
pub struct Scheduler {
    resolver: Arc<Resolver>,
    store: Arc<StatusStore>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        resolver: Arc<Resolver>,
        store: Arc<StatusStore>,
        config: SchedulerConfig,
    ) -> (Self, SchedulerHandle, mpsc::Receiver<SchedulerCommand>) {
        let (tx, rx) = mpsc::channel(config::COMMAND_CHANNEL_CAPACITY);
        (
            Self {
                resolver,
                store,
                config,
            },
            SchedulerHandle { tx },
            rx,
        )
    }

    /// Run until cancelled.
    pub async fn run(
        self,
        mut command_rx: mpsc::Receiver<SchedulerCommand>,
        cancel_token: CancellationToken,
    ) {
        info!(interval = self.store.interval(), "Scheduler started");

        let mut next_scan = Instant::now();
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    break;
                }

                cmd = command_rx.recv(), if commands_open => {
                    match cmd {
                        Some(SchedulerCommand::ForceScan { reply }) => {
                            info!("Forced scan requested");
                            let result = self.resolver.scan(true).await;
                            if let Err(e) = &result {
                                warn!(error = %e, "Forced scan failed");
                            }
                            if let Some(reply) = reply {
                                let _ = reply.send(result);
                            }
                        }
                        None => {
                            debug!("All scheduler handles dropped");
                            commands_open = false;
                        }
                    }
                }

                _ = sleep_until(next_scan) => {
                    let delay = self.periodic_scan().await;
                    next_scan = Instant::now() + delay;
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Run one periodic scan and return how long to sleep afterwards.
    async fn periodic_scan(&self) -> Duration {
        let interval = Duration::from_secs(self.store.interval());
        debug!(interval_secs = interval.as_secs(), "Running periodic scan");

        match self.resolver.scan(false).await {
            Ok(outcome) => {
                debug!(?outcome, "Periodic scan finished");
                interval
            }
            Err(e) => {
                let backoff = self.config.error_backoff.max(interval);
                error!(
                    error = %e,
                    backoff_secs = backoff.as_secs(),
                    "Periodic scan failed"
                );
                backoff
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{NotificationPublisher, PublisherConfig};
    use crate::resolver::ResolverConfig;
    use crate::testing::{FakeSink, FakeSource};

    struct Fixture {
        store: Arc<StatusStore>,
        source: Arc<FakeSource>,
        handle: SchedulerHandle,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_scheduler(interval: u64) -> Fixture {
        let store = Arc::new(StatusStore::new(interval));
        let source = Arc::new(FakeSource::new());
        let sink = Arc::new(FakeSink::new());
        let publisher = Arc::new(NotificationPublisher::new(
            store.clone(),
            sink,
            PublisherConfig::default(),
        ));
        let resolver = Arc::new(Resolver::new(
            store.clone(),
            source.clone(),
            publisher,
            ResolverConfig::default(),
        ));
        let (scheduler, handle, rx) =
            Scheduler::new(resolver, store.clone(), SchedulerConfig::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler.run(rx, cancel.clone()));
        Fixture {
            store,
            source,
            handle,
            cancel,
            task,
        }
    }

    async fn advance_to(start: Instant, secs: u64) {
        tokio::time::sleep_until(start + Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_immediately_then_every_interval() {
        let start = Instant::now();
        let f = spawn_scheduler(30);

        advance_to(start, 1).await;
        assert_eq!(f.source.fetch_calls(), 1);

        advance_to(start, 95).await;
        // t = 0, 30, 60, 90
        assert_eq!(f.source.fetch_calls(), 4);

        f.cancel.cancel();
        f.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_read_each_cycle() {
        let start = Instant::now();
        let f = spawn_scheduler(30);

        advance_to(start, 1).await;
        f.store.set_interval(100);

        // The sleep started at t=0 still ends at t=30; the next one uses 100.
        advance_to(start, 125).await;
        assert_eq!(f.source.fetch_calls(), 2);
        advance_to(start, 131).await;
        assert_eq!(f.source.fetch_calls(), 3);

        f.cancel.cancel();
        f.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_backoff_is_at_least_fallback() {
        let start = Instant::now();
        let f = spawn_scheduler(30);
        f.source.fail_fetches(true);

        advance_to(start, 59).await;
        assert_eq!(f.source.fetch_calls(), 1);
        assert!(!f.store.is_live());

        advance_to(start, 61).await;
        assert_eq!(f.source.fetch_calls(), 2);

        f.cancel.cancel();
        f.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_backoff_never_shorter_than_interval() {
        let start = Instant::now();
        let f = spawn_scheduler(300);
        f.source.fail_fetches(true);

        advance_to(start, 299).await;
        assert_eq!(f.source.fetch_calls(), 1);
        advance_to(start, 301).await;
        assert_eq!(f.source.fetch_calls(), 2);

        f.cancel.cancel();
        f.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_scan_keeps_deadline() {
        let start = Instant::now();
        let f = spawn_scheduler(30);

        advance_to(start, 10).await;
        let outcome = f.handle.force_scan_and_wait().await.unwrap();
        assert!(outcome.is_changed());
        assert_eq!(f.source.fetch_calls(), 2);

        advance_to(start, 31).await;
        assert_eq!(f.source.fetch_calls(), 3);

        f.cancel.cancel();
        f.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let f = spawn_scheduler(30);
        f.cancel.cancel();
        f.task.await.unwrap();
        assert!(f.handle.force_scan().await.is_err());
    }
}
