//! Application-wide error types.

use chat_feed::ChatFeedError;
use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The message source could not be reached or refused our credential.
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(#[source] ChatFeedError),

    /// A write to the notification sink failed.
    #[error("Sink write failed: {0}")]
    Sink(#[source] ChatFeedError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error means the feed credential is unusable.
    pub fn is_fatal_feed_error(&self) -> bool {
        matches!(self, Self::FeedUnavailable(e) if e.is_fatal())
    }
}
