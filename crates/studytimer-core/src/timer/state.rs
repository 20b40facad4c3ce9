//! Session lifecycle as an explicit state machine.
//!
//! ```text
//! Idle -> Stopped <-> Running -> Completed
//! ```
//!
//! [`transition`] is the only place phases change. It is pure: the caller
//! supplies `now_ms` and persists whatever the returned phase implies.

use serde::{Deserialize, Serialize};

use super::reconcile;
use super::session::TimerSession;
use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TimerPhase {
    /// No record exists yet.
    Idle,
    Stopped {
        remaining_secs: u64,
    },
    Running {
        anchor_ms: i64,
        initial_remaining_secs: u64,
    },
    Completed {
        credited_minutes: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// First access: seed the countdown from the study day's budget.
    Seed { budget_secs: u64 },
    Start,
    Stop,
    /// The countdown is believed to have reached zero.
    Expire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: TimerPhase,
    /// Whole minutes to hand to the completion handler; zero means none.
    pub credited_minutes: u64,
}

impl Transition {
    fn quiet(next: TimerPhase) -> Self {
        Self {
            next,
            credited_minutes: 0,
        }
    }
}

impl TimerPhase {
    /// Phase implied by a stored record.
    pub fn from_record(session: &TimerSession) -> Self {
        match session.live_anchor() {
            Some(anchor_ms) => TimerPhase::Running {
                anchor_ms,
                initial_remaining_secs: session.initial_remaining_seconds,
            },
            None => TimerPhase::Stopped {
                remaining_secs: session.initial_remaining_seconds,
            },
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Running { .. })
    }

    /// Remaining seconds at `now_ms`, reconciled from the anchor when running.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match *self {
            TimerPhase::Idle | TimerPhase::Completed { .. } => 0,
            TimerPhase::Stopped { remaining_secs } => remaining_secs,
            TimerPhase::Running {
                anchor_ms,
                initial_remaining_secs,
            } => reconcile::remaining_seconds(anchor_ms, initial_remaining_secs, now_ms),
        }
    }

    /// Record to persist for this phase; `None` means the record is deleted.
    pub fn to_record(&self, session_id: &str) -> Option<TimerSession> {
        match *self {
            TimerPhase::Idle | TimerPhase::Completed { .. } => None,
            TimerPhase::Stopped { remaining_secs } => {
                Some(TimerSession::stopped(session_id, remaining_secs))
            }
            TimerPhase::Running {
                anchor_ms,
                initial_remaining_secs,
            } => Some(TimerSession::running(
                session_id,
                anchor_ms,
                initial_remaining_secs,
            )),
        }
    }
}

/// Apply `command` to `phase` at wall-clock `now_ms`.
pub fn transition(
    phase: TimerPhase,
    command: TimerCommand,
    now_ms: i64,
) -> Result<Transition, TransitionError> {
    use TimerCommand as C;
    use TimerPhase as P;

    match (phase, command) {
        (P::Completed { .. }, _) => Err(TransitionError::AlreadyCompleted),

        (P::Idle | P::Stopped { .. }, C::Seed { budget_secs }) => {
            Ok(Transition::quiet(P::Stopped {
                remaining_secs: budget_secs,
            }))
        }
        (P::Running { .. }, C::Seed { .. } | C::Start) => Err(TransitionError::AlreadyRunning),

        (P::Idle, C::Start) => Err(TransitionError::NothingRemaining),
        (P::Stopped { remaining_secs }, C::Start) => {
            if remaining_secs == 0 {
                return Err(TransitionError::NothingRemaining);
            }
            Ok(Transition::quiet(P::Running {
                anchor_ms: now_ms,
                initial_remaining_secs: remaining_secs,
            }))
        }

        (P::Idle | P::Stopped { .. }, C::Stop | C::Expire) => Err(TransitionError::NotRunning),

        (
            P::Running {
                anchor_ms,
                initial_remaining_secs,
            },
            C::Stop,
        ) => {
            let remaining = reconcile::remaining_seconds(anchor_ms, initial_remaining_secs, now_ms);
            Ok(Transition {
                next: P::Stopped {
                    remaining_secs: remaining,
                },
                credited_minutes: reconcile::minutes_on_stop(initial_remaining_secs, remaining),
            })
        }

        (
            P::Running {
                anchor_ms,
                initial_remaining_secs,
            },
            C::Expire,
        ) => {
            let remaining = reconcile::remaining_seconds(anchor_ms, initial_remaining_secs, now_ms);
            if remaining > 0 {
                return Err(TransitionError::NotExpired {
                    remaining_secs: remaining,
                });
            }
            let credited = reconcile::minutes_on_completion(initial_remaining_secs);
            Ok(Transition {
                next: P::Completed {
                    credited_minutes: credited,
                },
                credited_minutes: credited,
            })
        }
    }
}
