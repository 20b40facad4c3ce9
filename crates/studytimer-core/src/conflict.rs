//! Conflict resolution between the session being opened and the one that
//! currently owns the active timer pointer.
//!
//! ```text
//! Checking -> { NoConflict, ConflictDetected }
//! ConflictDetected -> { NavigateToOther, DiscardOther, Cancel }
//! ```
//!
//! The check runs on screen entry and again right before a session starts;
//! the second run is what enforces the single-active-timer invariant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::registry::{ActiveTimerPointer, ActiveTimerRegistry, ConflictCheck};
use crate::timer::SessionStore;

/// What the user picked when shown a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Go to the session that is already running. Nothing is mutated.
    NavigateToOther,
    /// Drop the other session's pointer and record, then continue.
    DiscardOther,
    /// Abort the entry or start flow. Nothing is mutated.
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Proceed,
    Navigate(ActiveTimerPointer),
    Abort,
}

#[derive(Clone)]
pub struct ConflictResolver {
    registry: ActiveTimerRegistry,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
}

impl ConflictResolver {
    pub fn new(registry: ActiveTimerRegistry, sessions: SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            sessions,
            clock,
        }
    }

    /// Check whether `session_id` may own the running state.
    ///
    /// A pointer whose session record is gone, unreadable, stopped, or
    /// already out of time is dangling: it is cleared and no conflict is
    /// reported. An expired record is left in place so its own screen can
    /// still credit it.
    pub async fn check(&self, session_id: &str) -> ConflictCheck {
        let pointer = match self.registry.has_conflict(session_id).await {
            ConflictCheck::Clear => return ConflictCheck::Clear,
            ConflictCheck::Conflict(pointer) => pointer,
        };

        let live = match self.sessions.load(&pointer.session_id).await {
            Ok(Some(record)) => {
                record.live_anchor().is_some() && record.remaining_at(self.clock.now_ms()) > 0
            }
            Ok(None) => false,
            Err(e) => {
                warn!(other = %pointer.session_id, error = %e, "unreadable conflicting session record, treating as absent");
                false
            }
        };

        if !live {
            info!(other = %pointer.session_id, "discarding dangling active timer pointer");
            self.registry.clear().await;
            return ConflictCheck::Clear;
        }

        debug!(session_id, other = %pointer.session_id, "active timer conflict");
        ConflictCheck::Conflict(pointer)
    }

    /// Apply the user's choice for a detected conflict.
    pub async fn resolve(&self, choice: ConflictChoice, other: &ActiveTimerPointer) -> Resolution {
        match choice {
            ConflictChoice::NavigateToOther => Resolution::Navigate(other.clone()),
            ConflictChoice::Cancel => Resolution::Abort,
            ConflictChoice::DiscardOther => {
                info!(other = %other.session_id, "discarding conflicting timer");
                self.registry.clear().await;
                if let Err(e) = self.sessions.delete(&other.session_id).await {
                    warn!(other = %other.session_id, error = %e, "failed to delete discarded session record");
                }
                Resolution::Proceed
            }
        }
    }
}
