//! Re-scan scheduling.

mod service;

pub use service::{
    DEFAULT_ERROR_BACKOFF_SECS, Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle,
};
