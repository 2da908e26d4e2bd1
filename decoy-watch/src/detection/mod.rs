//! Decoy signal detection.
//!
//! Classification is exact pattern matching on message text; see
//! [`classify`] for the recognised shapes.

mod matcher;

pub use matcher::{DecoyMessage, Signal, classify, is_server_candidate};
