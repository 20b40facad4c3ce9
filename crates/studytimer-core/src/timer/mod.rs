mod engine;
pub mod reconcile;
mod session;
mod state;
mod ticker;

pub use engine::{
    EntryOutcome, ExpireOutcome, Finish, ReportStatus, RestoreOutcome, StartOutcome, StudyTimer,
    TimerContext, WatchExit, WatchSignal,
};
pub use reconcile::{format_clock, initial_budget, remaining_seconds};
pub use session::{SessionStore, TimerSession};
pub use state::{transition, TimerCommand, TimerPhase, Transition};
pub use ticker::{TickOutcome, VisualTicker};
