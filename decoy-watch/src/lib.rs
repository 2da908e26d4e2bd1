//! decoy-watch: decoy check status monitor.
//!
//! Watches a Discord channel for the game server's decoy check
//! announcements, resolves them into a single ON/OFF status and republishes
//! it as one maintained message in an output channel and over a small HTTP
//! API.
//!
//! ## Components
//!
//! - [`status::StatusStore`] - the current status behind one lock
//! - [`detection::classify`] - exact ON/OFF pattern matching
//! - [`resolver::Resolver`] - most-recent-wins resolution of scanned messages
//! - [`publisher::NotificationPublisher`] - create-or-edit of the status message
//! - [`scheduler::Scheduler`] - periodic and forced re-scans
//! - [`listener::LiveListener`] - incremental updates and chat commands
//! - [`api::ApiServer`] - read-only status endpoints

pub mod api;
pub mod commands;
pub mod config;
pub mod detection;
pub mod error;
pub mod listener;
pub mod logging;
pub mod panic_hook;
pub mod publisher;
pub mod resolver;
pub mod scheduler;
pub mod services;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Error, Result};
