//! Foreground-only countdown display.
//!
//! The ticker smooths the display between resumes by decrementing an
//! in-memory counter once per period. It is never a time source: every
//! activation and every foreground resume replaces the counter with a value
//! reconciled from the persisted anchor.

use super::session::TimerSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not armed; nothing to do.
    Idle,
    /// New value to display.
    Continue(u64),
    /// The display reached zero. The ticker disarms itself so a second tick
    /// cannot fire the completion path again.
    Expired,
}

#[derive(Debug, Default, Clone)]
pub struct VisualTicker {
    display_secs: Option<u64>,
}

impl VisualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm from a running record, replacing any drifted counter. Returns the
    /// reconciled display value.
    pub fn activate(&mut self, session: &TimerSession, now_ms: i64) -> u64 {
        let remaining = session.remaining_at(now_ms);
        self.display_secs = Some(remaining);
        remaining
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.display_secs {
            None => TickOutcome::Idle,
            Some(secs) if secs <= 1 => {
                self.display_secs = None;
                TickOutcome::Expired
            }
            Some(secs) => {
                self.display_secs = Some(secs - 1);
                TickOutcome::Continue(secs - 1)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.display_secs = None;
    }

    pub fn is_armed(&self) -> bool {
        self.display_secs.is_some()
    }

    pub fn display(&self) -> Option<u64> {
        self.display_secs
    }
}
