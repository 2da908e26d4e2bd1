//! Process configuration.
//!
//! [`AppConfig::from_env`] reads environment variables (after `.env` has been
//! loaded with `dotenvy`) and falls back to defaults for everything except the
//! Discord token. Each service keeps its own config struct; the service
//! container maps these values onto them.

use std::str::FromStr;

use chat_feed::ChannelId;
use chat_feed::discord::DEFAULT_API_BASE;

use crate::error::{Error, Result};

const DEFAULT_TARGET_CHANNEL_ID: u64 = 1400943479302914210;
const DEFAULT_OUTPUT_CHANNEL_ID: u64 = 1415310746174099457;
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
const DEFAULT_HISTORY_LIMIT: usize = 200;
const DEFAULT_STATUS_RETENTION: usize = 1;
const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const DEFAULT_API_HOST: &str = "0.0.0.0";
const DEFAULT_API_PORT: u16 = 5000;
const DEFAULT_LOG_DIR: &str = "./logs";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Discord account token.
    pub discord_token: String,
    /// Whether the token is a bot token.
    pub discord_bot: bool,
    /// Discord REST base URL.
    pub discord_api_base: String,
    /// Channel watched for decoy signals and commands.
    pub target_channel_id: ChannelId,
    /// Channel holding the status message.
    pub output_channel_id: ChannelId,
    /// Initial scan interval. Not range-checked here.
    pub check_interval_secs: u64,
    /// Messages fetched per bulk scan.
    pub history_limit: usize,
    /// Status messages kept after cleanup.
    pub status_retention: usize,
    /// Scheduler sleep after a failed scan.
    pub error_backoff_secs: u64,
    /// Live listener poll period.
    pub poll_interval_ms: u64,
    /// Status API bind address.
    pub api_host: String,
    /// Status API port.
    pub api_port: u16,
    /// Rolling log directory.
    pub log_dir: String,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN")
            .ok_or_else(|| Error::config("DISCORD_TOKEN environment variable is required"))?;

        Ok(Self {
            discord_token,
            discord_bot: parse_or(get("DISCORD_BOT"), "DISCORD_BOT", false)?,
            discord_api_base: get("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            target_channel_id: ChannelId(parse_or(
                get("TARGET_CHANNEL_ID"),
                "TARGET_CHANNEL_ID",
                DEFAULT_TARGET_CHANNEL_ID,
            )?),
            output_channel_id: ChannelId(parse_or(
                get("OUTPUT_CHANNEL_ID"),
                "OUTPUT_CHANNEL_ID",
                DEFAULT_OUTPUT_CHANNEL_ID,
            )?),
            check_interval_secs: parse_or(
                get("CHECK_INTERVAL"),
                "CHECK_INTERVAL",
                DEFAULT_CHECK_INTERVAL_SECS,
            )?,
            history_limit: parse_or(
                get("HISTORY_LIMIT"),
                "HISTORY_LIMIT",
                DEFAULT_HISTORY_LIMIT,
            )?,
            status_retention: parse_or(
                get("STATUS_RETENTION"),
                "STATUS_RETENTION",
                DEFAULT_STATUS_RETENTION,
            )?,
            error_backoff_secs: parse_or(
                get("ERROR_BACKOFF_SECS"),
                "ERROR_BACKOFF_SECS",
                DEFAULT_ERROR_BACKOFF_SECS,
            )?,
            poll_interval_ms: parse_or(
                get("POLL_INTERVAL_MS"),
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?,
            api_host: get("API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            api_port: parse_or(get("API_PORT"), "API_PORT", DEFAULT_API_PORT)?,
            log_dir: get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "token")]).unwrap();
        assert_eq!(config.discord_token, "token");
        assert!(!config.discord_bot);
        assert_eq!(config.target_channel_id, ChannelId(DEFAULT_TARGET_CHANNEL_ID));
        assert_eq!(config.output_channel_id, ChannelId(DEFAULT_OUTPUT_CHANNEL_ID));
        assert_eq!(config.check_interval_secs, 5);
        assert_eq!(config.history_limit, 200);
        assert_eq!(config.status_retention, 1);
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 5000);
    }

    #[test]
    fn test_missing_token() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = load(&[("DISCORD_TOKEN", "   ")]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DISCORD_TOKEN", "token"),
            ("DISCORD_BOT", "true"),
            ("TARGET_CHANNEL_ID", "11"),
            ("OUTPUT_CHANNEL_ID", "22"),
            ("CHECK_INTERVAL", "2"),
            ("API_PORT", "8080"),
        ])
        .unwrap();
        assert!(config.discord_bot);
        assert_eq!(config.target_channel_id, ChannelId(11));
        assert_eq!(config.output_channel_id, ChannelId(22));
        // Startup interval is taken as-is, even below the command range.
        assert_eq!(config.check_interval_secs, 2);
        assert_eq!(config.api_port, 8080);
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("DISCORD_TOKEN", "token"), ("CHECK_INTERVAL", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CHECK_INTERVAL"));
    }
}
