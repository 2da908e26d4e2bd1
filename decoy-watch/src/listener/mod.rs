//! Live feed listener.
//!
//! Polls the target channel for messages newer than the last one seen. Each
//! new message is applied incrementally and checked for commands.

mod backoff;
mod service;

pub use backoff::PollBackoff;
pub use service::{DEFAULT_POLL_INTERVAL_MS, ListenerConfig, LiveListener};
