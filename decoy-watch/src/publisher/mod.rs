//! Status publication into the output channel.
//!
//! The [`NotificationPublisher`] owns the canonical notification handle and
//! keeps a single up-to-date status message visible, recreating it when the
//! existing one can no longer be edited.

pub mod format;
mod service;

pub use service::{
    CleanupReport, DEFAULT_CLEANUP_SCAN_LIMIT, DEFAULT_STATUS_RETENTION, NotificationPublisher,
    PublishOutcome, PublisherConfig,
};
