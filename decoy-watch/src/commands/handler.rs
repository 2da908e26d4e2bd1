//! Chat command execution.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chat_feed::ChatMessage;
use tracing::info;

use crate::commands::Command;
use crate::detection::DecoyMessage;
use crate::error::{Error, Result};
use crate::publisher::NotificationPublisher;
use crate::publisher::format::{
    format_time, render_bot_info, render_cleanup_notice, render_interval_changed,
};
use crate::resolver::Resolver;
use crate::scheduler::SchedulerHandle;
use crate::status::StatusStore;

/// Intervals accepted from `!interval`, in seconds.
pub const INTERVAL_RANGE: RangeInclusive<u64> = 30..=600;

const SERVER_MESSAGE_WINDOW: usize = 100;
const SERVER_MESSAGE_MAX: usize = 10;

/// Executes chat commands against the running services.
pub struct CommandHandler {
    store: Arc<StatusStore>,
    resolver: Arc<Resolver>,
    publisher: Arc<NotificationPublisher>,
    scheduler: SchedulerHandle,
}

impl CommandHandler {
    pub fn new(
        store: Arc<StatusStore>,
        resolver: Arc<Resolver>,
        publisher: Arc<NotificationPublisher>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            store,
            resolver,
            publisher,
            scheduler,
        }
    }

    /// Run the command in `message`, if it carries one.
    pub async fn dispatch(&self, message: &ChatMessage) -> Result<Option<Command>> {
        let Some(command) = Command::parse(&message.content) else {
            return Ok(None);
        };
        info!(
            command = command.name(),
            author = %message.author_name,
            "Command received"
        );
        self.execute(&command).await?;
        Ok(Some(command))
    }

    pub async fn execute(&self, command: &Command) -> Result<()> {
        match command {
            Command::DecoyStatus | Command::UpdateStatus => {
                let outcome = self.publisher.publish().await;
                info!(?outcome, "Status republished on request");
            }
            Command::SearchDecoy => {
                self.scheduler.force_scan().await?;
            }
            Command::SetInterval(raw) => {
                let secs = self.set_interval_str(raw)?;
                self.publisher
                    .announce(&render_interval_changed(secs))
                    .await?;
            }
            Command::ShowInterval => {
                info!(
                    interval = self.store.interval(),
                    "Current check interval. Use: !interval <seconds>"
                );
            }
            Command::Cleanup => {
                let report = self.publisher.cleanup().await;
                info!(
                    kept = report.kept,
                    deleted = report.deleted,
                    failed = report.failed,
                    "Cleanup requested"
                );
                self.publisher.announce(&render_cleanup_notice()).await?;
            }
            Command::BotInfo => {
                let text = render_bot_info(&self.store.read());
                self.publisher.announce(&text).await?;
            }
            Command::ShowDecoyMessages => {
                let signals = self.resolver.collect_signals().await?;
                log_signals(&signals);
            }
            Command::ServerMessages => {
                let messages = self
                    .resolver
                    .server_messages(SERVER_MESSAGE_WINDOW, SERVER_MESSAGE_MAX)
                    .await?;
                info!(count = messages.len(), "Potential server messages");
                for message in &messages {
                    info!(
                        time = %format_time(message.timestamp),
                        author = %message.author_name,
                        content = %message.content,
                        "Server message"
                    );
                }
            }
        }
        Ok(())
    }

    /// Change the scan interval. Values outside [`INTERVAL_RANGE`] are
    /// rejected and leave the interval untouched.
    pub fn set_interval(&self, secs: u64) -> Result<()> {
        if !INTERVAL_RANGE.contains(&secs) {
            return Err(Error::validation(format!(
                "Interval must be between {} and {} seconds, got {}",
                INTERVAL_RANGE.start(),
                INTERVAL_RANGE.end(),
                secs
            )));
        }
        self.store.set_interval(secs);
        info!(interval = secs, "Check interval changed");
        Ok(())
    }

    fn set_interval_str(&self, raw: &str) -> Result<u64> {
        let secs: u64 = raw.parse().map_err(|_| {
            Error::validation(format!(
                "Invalid interval value '{}'. Use: !interval <seconds>",
                raw
            ))
        })?;
        self.set_interval(secs)?;
        Ok(secs)
    }
}

fn log_signals(signals: &[DecoyMessage]) {
    info!(count = signals.len(), "Decoy messages in recent history");
    for (i, signal) in signals.iter().enumerate() {
        info!(
            index = i + 1,
            time = %format_time(signal.timestamp),
            status = %signal.status,
            content = %signal.text,
            "Decoy message"
        );
    }
    if let Some(latest) = signals.first() {
        info!(
            status = %latest.status,
            signal_time = %format_time(latest.timestamp),
            "Most recent decoy status"
        );
    }
}
