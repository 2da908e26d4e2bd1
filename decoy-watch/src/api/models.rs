//! API response models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::{DecoyStatus, StatusSnapshot};

pub const API_VERSION: &str = "1.0";

/// Public endpoints and their descriptions.
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("/status", "GET - Get current decoy status"),
    ("/health", "GET - Health check"),
    ("/info", "GET - API information"),
];

fn iso(time: Option<DateTime<Utc>>) -> Option<String> {
    time.map(|t| t.to_rfc3339())
}

/// Status payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub status: DecoyStatus,
    /// Time of the signal behind `status`.
    pub last_update: Option<String>,
    pub last_check: Option<String>,
    pub bot_online: bool,
    pub check_interval: u64,
}

impl From<&StatusSnapshot> for StatusData {
    fn from(snapshot: &StatusSnapshot) -> Self {
        Self {
            status: snapshot.status,
            last_update: iso(snapshot.last_signal_time),
            last_check: iso(snapshot.last_check_time),
            bot_online: snapshot.live,
            check_interval: snapshot.interval_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub data: StatusData,
    pub api_version: &'static str,
    pub timestamp: String,
}

/// Service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The feed connection is confirmed working.
    Healthy,
    /// The API is up but the feed is not.
    Degraded,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub bot_online: bool,
    pub last_check: Option<String>,
    pub timestamp: String,
}

impl From<&StatusSnapshot> for HealthResponse {
    fn from(snapshot: &StatusSnapshot) -> Self {
        Self {
            status: if snapshot.live {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            bot_online: snapshot.live,
            last_check: iso(snapshot.last_check_time),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: serde_json::Map<String, serde_json::Value>,
    pub uptime_secs: u64,
    pub timestamp: String,
}

impl InfoResponse {
    pub fn new(uptime_secs: u64) -> Self {
        let endpoints = ENDPOINTS
            .iter()
            .map(|(path, desc)| (path.to_string(), serde_json::Value::from(*desc)))
            .collect();
        Self {
            name: "Decoy Status API",
            version: API_VERSION,
            description: "Public API for checking decoy status from Discord",
            endpoints,
            uptime_secs,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
