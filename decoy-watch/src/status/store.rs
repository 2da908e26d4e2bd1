//! Status store implementation.

use chat_feed::MessageId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Decoy check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecoyStatus {
    /// A decoy check is in progress.
    On,
    /// No decoy check is running.
    #[default]
    Off,
}

impl DecoyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DecoyStatus::On => "ON",
            DecoyStatus::Off => "OFF",
        }
    }
}

impl std::fmt::Display for DecoyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current status together with its provenance.
///
/// `status` and `last_signal_time` always come from the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFact {
    pub status: DecoyStatus,
    /// Timestamp of the message (or implicit scan) that produced `status`.
    pub last_signal_time: Option<DateTime<Utc>>,
    /// Time of the most recent scan attempt.
    pub last_check_time: Option<DateTime<Utc>>,
}

/// Immutable copy of everything in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: DecoyStatus,
    pub last_signal_time: Option<DateTime<Utc>>,
    pub last_check_time: Option<DateTime<Utc>>,
    pub live: bool,
    pub interval_secs: u64,
    pub notification_handle: Option<MessageId>,
}

impl StatusSnapshot {
    pub fn fact(&self) -> StatusFact {
        StatusFact {
            status: self.status,
            last_signal_time: self.last_signal_time,
            last_check_time: self.last_check_time,
        }
    }
}

#[derive(Debug)]
struct Inner {
    fact: StatusFact,
    live: bool,
    interval_secs: u64,
    notification_handle: Option<MessageId>,
}

/// Process-wide status state behind a single lock.
///
/// Every accessor holds the lock only while copying fields, so it is safe to
/// call from async code; the guard never crosses an `.await`.
#[derive(Debug)]
pub struct StatusStore {
    inner: Mutex<Inner>,
}

impl StatusStore {
    /// Create a store with status OFF, not live, and the given interval.
    pub fn new(interval_secs: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                fact: StatusFact::default(),
                live: false,
                interval_secs,
                notification_handle: None,
            }),
        }
    }

    /// Set status and signal time together and stamp the check time.
    pub fn write(&self, status: DecoyStatus, signal_time: DateTime<Utc>) {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        inner.fact = StatusFact {
            status,
            last_signal_time: Some(signal_time),
            last_check_time: Some(now),
        };
    }

    /// Record a scan attempt that did not change the status.
    pub fn touch(&self) {
        let now = Utc::now();
        self.inner.lock().fact.last_check_time = Some(now);
    }

    pub fn read(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        StatusSnapshot {
            status: inner.fact.status,
            last_signal_time: inner.fact.last_signal_time,
            last_check_time: inner.fact.last_check_time,
            live: inner.live,
            interval_secs: inner.interval_secs,
            notification_handle: inner.notification_handle,
        }
    }

    pub fn fact(&self) -> StatusFact {
        self.inner.lock().fact
    }

    pub fn set_live(&self, live: bool) {
        self.inner.lock().live = live;
    }

    pub fn is_live(&self) -> bool {
        self.inner.lock().live
    }

    /// Replace the scan interval. Range checks belong to the caller.
    pub fn set_interval(&self, secs: u64) {
        self.inner.lock().interval_secs = secs;
    }

    pub fn interval(&self) -> u64 {
        self.inner.lock().interval_secs
    }

    pub fn set_notification_handle(&self, handle: Option<MessageId>) {
        self.inner.lock().notification_handle = handle;
    }

    pub fn notification_handle(&self) -> Option<MessageId> {
        self.inner.lock().notification_handle
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(5)
    }
}
