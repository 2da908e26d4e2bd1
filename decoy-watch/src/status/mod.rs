//! Shared status state.
//!
//! The [`StatusStore`] holds the one current decoy status together with the
//! liveness flag, the scan interval and the canonical notification handle.

mod store;

pub use store::{DecoyStatus, StatusFact, StatusSnapshot, StatusStore};
