//! Chat feed error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, ChatFeedError>;

/// Errors that can occur while talking to the chat service.
#[derive(Error, Debug)]
pub enum ChatFeedError {
    /// Transport-level HTTP failure (connect, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The credential was rejected (401).
    #[error("Unauthorized: the token was rejected")]
    Unauthorized,

    /// Missing permission for the requested action (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The channel or message does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Still rate limited after the retry budget was spent.
    #[error("Rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    /// Any other non-success response.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response decoded but did not contain what we expected.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ChatFeedError {
    /// Create an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether the target message or channel is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the request was refused for lack of permission.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Whether retrying with the same credential is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
