//! Read-only Status API.
//!
//! Exposes the current status over HTTP:
//!
//! - `GET /status` - status, signal time, last check, liveness, interval
//! - `GET /health` - `healthy` while the feed is live, `degraded` otherwise
//! - `GET /info` - API name, version and endpoint list
//!
//! Unknown routes get a JSON 404 and handler panics a JSON 500.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
