//! chat-feed: chat message feed and notification sink for Discord channels.
//!
//! This crate provides the transport side of a channel watcher: reading
//! timestamped chat messages from one channel and writing, editing and
//! deleting messages in another.
//!
//! ## Core Types
//!
//! - [`ChatMessage`] - A single chat message with author and timestamp
//! - [`MessageId`], [`ChannelId`], [`UserId`] - Discord snowflake identifiers
//! - [`MessageSource`] - Trait for reading channel history and new messages
//! - [`NotificationSink`] - Trait for publishing into an output channel
//!
//! ## Discord
//!
//! - [`DiscordClient`] - REST client with rate limit handling
//! - [`DiscordChannel`] - Per-channel view implementing both traits

pub mod discord;
pub mod error;
pub mod message;
pub mod provider;

pub use discord::{DiscordChannel, DiscordClient, DiscordConfig};
pub use error::{ChatFeedError, Result};
pub use message::{ChannelId, ChatMessage, MessageId, UserId};
pub use provider::{MessageSource, NotificationSink};
