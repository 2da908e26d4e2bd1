//! Service container for dependency injection.
//!
//! The ServiceContainer wires the status store, resolver, publisher,
//! scheduler, listener and API together and manages their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use chat_feed::{DiscordClient, DiscordConfig, MessageSource, NotificationSink};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{ApiServer, ApiServerConfig, AppState};
use crate::commands::CommandHandler;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::listener::{ListenerConfig, LiveListener};
use crate::logging::LoggingConfig;
use crate::publisher::{DEFAULT_CLEANUP_SCAN_LIMIT, NotificationPublisher, PublisherConfig};
use crate::resolver::{DEFAULT_SIGNAL_WINDOW, Resolver, ResolverConfig};
use crate::scheduler::{Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle};
use crate::status::StatusStore;

/// Default shutdown timeout.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Service container holding all application services.
pub struct ServiceContainer {
    pub config: AppConfig,
    pub store: Arc<StatusStore>,
    pub publisher: Arc<NotificationPublisher>,
    pub resolver: Arc<Resolver>,
    pub commands: Arc<CommandHandler>,
    pub scheduler: SchedulerHandle,
    source: Arc<dyn MessageSource>,
    pending_scheduler: Mutex<Option<(Scheduler, mpsc::Receiver<SchedulerCommand>)>>,
    logging_config: Option<Arc<LoggingConfig>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Build the container against Discord.
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = DiscordClient::new(DiscordConfig {
            token: config.discord_token.clone(),
            bot: config.discord_bot,
            api_base: config.discord_api_base.clone(),
            ..Default::default()
        })
        .map_err(|e| Error::config(format!("Failed to create Discord client: {}", e)))?;
        let client = Arc::new(client);

        let source = Arc::new(client.channel(config.target_channel_id));
        let sink = Arc::new(client.channel(config.output_channel_id));
        Ok(Self::with_feed(config, source, sink))
    }

    /// Build the container around an arbitrary source and sink.
    pub fn with_feed(
        config: AppConfig,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        info!("Initializing service container");

        let store = Arc::new(StatusStore::new(config.check_interval_secs));

        let publisher = Arc::new(NotificationPublisher::new(
            store.clone(),
            sink,
            PublisherConfig {
                cleanup_scan_limit: DEFAULT_CLEANUP_SCAN_LIMIT,
                retention: config.status_retention,
            },
        ));

        let resolver = Arc::new(Resolver::new(
            store.clone(),
            source.clone(),
            publisher.clone(),
            ResolverConfig {
                history_limit: config.history_limit,
                signal_window: DEFAULT_SIGNAL_WINDOW,
            },
        ));

        let (scheduler, scheduler_handle, scheduler_rx) = Scheduler::new(
            resolver.clone(),
            store.clone(),
            SchedulerConfig {
                error_backoff: Duration::from_secs(config.error_backoff_secs),
            },
        );

        let commands = Arc::new(CommandHandler::new(
            store.clone(),
            resolver.clone(),
            publisher.clone(),
            scheduler_handle.clone(),
        ));

        info!("Service container initialized");

        Self {
            config,
            store,
            publisher,
            resolver,
            commands,
            scheduler: scheduler_handle,
            source,
            pending_scheduler: Mutex::new(Some((scheduler, scheduler_rx))),
            logging_config: None,
            tasks: Mutex::new(Vec::new()),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_logging_config(mut self, logging_config: Arc<LoggingConfig>) -> Self {
        self.logging_config = Some(logging_config);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            ..Default::default()
        }
    }

    /// Spawn the scheduler and the live listener.
    pub fn start_monitoring(&self) -> Result<()> {
        let Some((scheduler, scheduler_rx)) = self.pending_scheduler.lock().take() else {
            return Err(Error::Other("Monitoring already started".to_string()));
        };

        let token = self.cancellation_token.clone();
        let scheduler_task = tokio::spawn(scheduler.run(scheduler_rx, token));

        let listener = LiveListener::new(
            self.source.clone(),
            self.store.clone(),
            self.resolver.clone(),
            self.commands.clone(),
            self.listener_config(),
        );
        let token = self.cancellation_token.clone();
        let listener_task = tokio::spawn(async move {
            if let Err(e) = listener.run(token).await {
                error!(error = %e, "Live listener exited");
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.push(scheduler_task);
        tasks.push(listener_task);
        Ok(())
    }

    /// Spawn the Status API server.
    pub fn start_api(&self) {
        let config = ApiServerConfig {
            bind_address: self.config.api_host.clone(),
            port: self.config.api_port,
            ..Default::default()
        };
        let server = ApiServer::new(config, AppState::new(self.store.clone()))
            .with_cancel_token(self.cancellation_token.clone());

        self.tasks.lock().push(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!(error = %e, "API server exited");
            }
        }));
    }

    /// Start every background service.
    pub fn start(&self) -> Result<()> {
        if let Some(logging) = &self.logging_config {
            logging.start_retention_cleanup(self.cancellation_token.clone());
            info!(filter = %logging.get_filter(), log_dir = %logging.log_dir().display(), "Logging active");
        }
        self.start_api();
        self.start_monitoring()?;
        info!(
            target_channel = %self.config.target_channel_id,
            output_channel = %self.config.output_channel_id,
            interval = self.store.interval(),
            "Decoy watch started"
        );
        Ok(())
    }

    /// Cancel all services and wait for them to stop.
    pub async fn shutdown(&self) {
        info!("Shutting down services");
        self.cancellation_token.cancel();
        self.store.set_live(false);

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        let wait_all = futures::future::join_all(tasks);
        if tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            warn!("Timed out waiting for services to stop");
        }
        info!("All services stopped");
    }
}
