use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictChoice;
use crate::timer::TimerPhase;

/// Every state change of a study timer produces an Event.
/// Hosts render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_id: String,
        remaining_secs: u64,
        anchor_ms: i64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        session_id: String,
        remaining_secs: u64,
        credited_minutes: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        session_id: String,
        credited_minutes: u64,
        at: DateTime<Utc>,
    },
    /// Display value re-derived from the persisted anchor.
    TimerResynced {
        session_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ConflictDetected {
        session_id: String,
        conflicting_session_id: String,
        conflicting_subject: String,
        at: DateTime<Utc>,
    },
    ConflictResolved {
        session_id: String,
        choice: ConflictChoice,
        at: DateTime<Utc>,
    },
    ProgressReported {
        session_id: String,
        minutes: u64,
        at: DateTime<Utc>,
    },
    /// Report failed after local state was cleared; shown to the user, not retried.
    ProgressReportFailed {
        session_id: String,
        minutes: u64,
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session_id: String,
        subject: String,
        state: TimerPhase,
        remaining_secs: u64,
        display: String,
        at: DateTime<Utc>,
    },
}
