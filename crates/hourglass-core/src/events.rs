use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every timer state change produces an Event.
/// Front ends render them; a `TimerStopped` carries the value to commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    /// Display refresh while running. Never the committed value.
    TimerTick {
        elapsed_ms: u64,
    },
    /// Timer stopped; `duration_secs` is the value to commit.
    TimerStopped {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// Full state snapshot.
    StateSnapshot {
        state: TimerState,
        elapsed_ms: u64,
        display: String,
        at: DateTime<Utc>,
    },
}
