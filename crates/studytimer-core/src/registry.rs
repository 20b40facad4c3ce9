//! Active timer registry.
//!
//! A single pointer, stored under `active_timer_global`, naming the session
//! that currently owns the running state. There is no lock around it: every
//! read self-heals stale entries and every failure degrades to "no active
//! timer" so a broken registry never blocks the user from studying.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::storage::{load_json, save_json, KeyValueStore, ACTIVE_TIMER_KEY};
use crate::study_day::StudyDay;
use crate::timer::{reconcile, TimerSession};

/// Singleton record identifying the running session, with enough of the
/// study day denormalized to render a cross-screen banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimerPointer {
    pub session_id: String,
    pub anchor_timestamp: Option<i64>,
    pub initial_remaining_seconds: u64,
    pub is_active: bool,
    pub display_payload: StudyDay,
}

impl ActiveTimerPointer {
    /// Pointer mirroring a running session record.
    pub fn for_session(session: &TimerSession, day: &StudyDay) -> Self {
        Self {
            session_id: session.session_id.clone(),
            anchor_timestamp: session.anchor_timestamp,
            initial_remaining_seconds: session.initial_remaining_seconds,
            is_active: session.is_active,
            display_payload: day.clone(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.display_payload.subject
    }

    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match self.anchor_timestamp {
            Some(anchor) if self.is_active => {
                reconcile::remaining_seconds(anchor, self.initial_remaining_seconds, now_ms)
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictCheck {
    /// No pointer, or the pointer names the caller's own session.
    Clear,
    /// Another session owns the running state.
    Conflict(ActiveTimerPointer),
}

impl ConflictCheck {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConflictCheck::Conflict(_))
    }
}

#[derive(Clone)]
pub struct ActiveTimerRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ActiveTimerRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Overwrite the pointer. Write failures are logged, not returned.
    pub async fn set_active(&self, pointer: &ActiveTimerPointer) {
        match save_json(self.store.as_ref(), ACTIVE_TIMER_KEY, pointer).await {
            Ok(()) => debug!(session_id = %pointer.session_id, "active timer pointer set"),
            Err(e) => warn!(session_id = %pointer.session_id, error = %e, "failed to save active timer pointer"),
        }
    }

    /// Current pointer, or `None`. An inactive pointer is cleared on sight.
    pub async fn get_active(&self) -> Option<ActiveTimerPointer> {
        let pointer = match load_json::<ActiveTimerPointer>(self.store.as_ref(), ACTIVE_TIMER_KEY).await {
            Ok(pointer) => pointer?,
            Err(e) => {
                warn!(error = %e, "failed to read active timer pointer, treating as absent");
                return None;
            }
        };

        if !pointer.is_active {
            debug!(session_id = %pointer.session_id, "clearing inactive timer pointer");
            self.clear().await;
            return None;
        }
        Some(pointer)
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.delete(ACTIVE_TIMER_KEY).await {
            warn!(error = %e, "failed to clear active timer pointer");
        }
    }

    /// Clear the pointer if it belongs to `session_id` (or is unreadable).
    /// Another session's pointer is left alone.
    pub async fn release(&self, session_id: &str) {
        if let Some(pointer) = self.get_active().await {
            if pointer.session_id != session_id {
                debug!(session_id, owner = %pointer.session_id, "pointer owned by another session, not releasing");
                return;
            }
        }
        self.clear().await;
    }

    pub async fn has_conflict(&self, session_id: &str) -> ConflictCheck {
        match self.get_active().await {
            Some(pointer) if pointer.session_id != session_id => ConflictCheck::Conflict(pointer),
            _ => ConflictCheck::Clear,
        }
    }

    /// Pointer for the "timer active" banner: only while time remains.
    /// A pointer whose countdown has already run out is cleared.
    pub async fn check_for_active(&self) -> Option<ActiveTimerPointer> {
        let pointer = self.get_active().await?;
        if pointer.remaining_at(self.clock.now_ms()) == 0 {
            debug!(session_id = %pointer.session_id, "active timer pointer expired");
            self.clear().await;
            return None;
        }
        Some(pointer)
    }
}
