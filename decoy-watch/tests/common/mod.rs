#![allow(dead_code)]

use std::sync::Arc;

use chat_feed::{ChatFeedError, UserId};
use chrono::{DateTime, TimeZone, Utc};
use decoy_watch::config::AppConfig;
use decoy_watch::listener::{ListenerConfig, LiveListener, PollBackoff};
use decoy_watch::services::ServiceContainer;
use decoy_watch::testing::{FakeSink, FakeSource};

pub const ON: &str = "Server: Decoy check in progress. Do not hit decoy npcs (5 min. remaining)";
pub const OFF: &str = "Server: Decoy check complete. thank you ^^";

pub const PLAYER_ID: UserId = UserId(55);

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub sink: Arc<FakeSink>,
    pub services: ServiceContainer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let source = Arc::new(FakeSource::new());
        let sink = Arc::new(FakeSink::new());
        let services = ServiceContainer::with_feed(config(overrides), source.clone(), sink.clone());
        Self {
            source,
            sink,
            services,
        }
    }

    /// A listener polling every 3s with deterministic backoff.
    pub fn listener(&self) -> LiveListener {
        LiveListener::new(
            self.source.clone(),
            self.services.store.clone(),
            self.services.resolver.clone(),
            self.services.commands.clone(),
            ListenerConfig {
                backoff: PollBackoff {
                    use_jitter: false,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    pub fn player_says(&self, content: &str) {
        self.source.push(PLAYER_ID, "player", content, Utc::now());
    }
}

pub fn config(overrides: &[(&str, &str)]) -> AppConfig {
    AppConfig::from_lookup(|key| {
        if key == "DISCORD_TOKEN" {
            return Some("test-token".to_string());
        }
        overrides
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
}

pub fn unauthorized() -> ChatFeedError {
    ChatFeedError::Unauthorized
}

pub fn bad_gateway() -> ChatFeedError {
    ChatFeedError::Api {
        status: 502,
        body: "bad gateway".to_string(),
    }
}
