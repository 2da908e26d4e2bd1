use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::status::DecoyStatus;

static DECOY_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)Server: Decoy check in progress\. Do not hit decoy npcs \(\d+ min\. remaining\)",
    )
    .expect("valid decoy ON pattern")
});

static DECOY_OFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Server: Decoy check complete\. thank you \^\^")
        .expect("valid decoy OFF pattern")
});

const SERVER_HINTS: &[&str] = &["server:", "decoy", "check", "complete", "progress"];

/// Result of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    On,
    Off,
    None,
}

impl Signal {
    /// The status this signal asserts, if any.
    pub fn status(self) -> Option<DecoyStatus> {
        match self {
            Signal::On => Some(DecoyStatus::On),
            Signal::Off => Some(DecoyStatus::Off),
            Signal::None => None,
        }
    }
}

/// A classified candidate within one resolve pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoyMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: DecoyStatus,
}

/// Classify message text as a decoy ON or OFF signal.
///
/// Matching is case-insensitive and may occur anywhere in the text. When a
/// message carries both shapes, ON wins.
pub fn classify(text: &str) -> Signal {
    if DECOY_ON.is_match(text) {
        Signal::On
    } else if DECOY_OFF.is_match(text) {
        Signal::Off
    } else {
        Signal::None
    }
}

/// Whether a message looks like it came from the game server.
///
/// Used only for diagnostics; much looser than [`classify`].
pub fn is_server_candidate(author_name: &str, text: &str) -> bool {
    if author_name.eq_ignore_ascii_case("server") {
        return true;
    }
    let lower = text.to_lowercase();
    SERVER_HINTS.iter().any(|hint| lower.contains(hint))
}
