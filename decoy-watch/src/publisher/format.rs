//! Message bodies for the output channel.

use chrono::{DateTime, Utc};

use crate::status::{DecoyStatus, StatusFact, StatusSnapshot};

/// Substring carried by every status message; cleanup keys on it.
pub const STATUS_TAG: &str = "DECOY STATUS";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NO_ACTIVITY: &str = "*No recent decoy activity detected*";
const COMMAND_LIST: &str = "!decoy_status, !search_decoy, !interval <sec>, !cleanup, !bot_info";

pub fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Render the canonical status message.
///
/// Depends only on `status` and `last_signal_time`, so equal facts always
/// produce byte-identical bodies.
pub fn render_status(fact: &StatusFact) -> String {
    let mut body = match fact.status {
        DecoyStatus::On => format!("@everyone\n🔴 **{}: ON**", STATUS_TAG),
        DecoyStatus::Off => format!("🟢 **{}: OFF**", STATUS_TAG),
    };
    match fact.last_signal_time {
        Some(time) => body.push_str(&format!("\n*Last updated: {}*", format_time(time))),
        None => {
            body.push('\n');
            body.push_str(NO_ACTIVITY);
        }
    }
    body
}

pub fn render_interval_changed(secs: u64) -> String {
    format!("✅ Check interval changed to {} seconds", secs)
}

pub fn render_cleanup_notice() -> String {
    "🧹 Cleaned up old status messages".to_string()
}

/// Render the `!bot_info` summary.
pub fn render_bot_info(snapshot: &StatusSnapshot) -> String {
    let mut text = String::from("🤖 **Bot Status**\n");
    text.push_str(&format!(
        "• Check interval: {} seconds\n",
        snapshot.interval_secs
    ));
    text.push_str(&format!("• Current decoy status: {}\n", snapshot.status));
    if let Some(time) = snapshot.last_signal_time {
        text.push_str(&format!("• Last update: {}\n", format_time(time)));
    }
    text.push_str(&format!("• Commands: {}", COMMAND_LIST));
    text
}
