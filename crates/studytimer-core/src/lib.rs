//! # Study Timer Core Library
//!
//! A countdown for one study-plan day that survives the host being
//! suspended, backgrounded or killed. Remaining time is recomputed from a
//! wall-clock anchor stored in a durable key-value store, and a single
//! process-wide pointer guarantees that at most one countdown runs at a time.
//!
//! ## Architecture
//!
//! - **Storage**: async key-value store (SQLite or in-memory) and TOML configuration
//! - **Timer**: pure reconciliation, an explicit lifecycle state machine, a
//!   cosmetic foreground ticker, and the [`StudyTimer`] engine tying them together
//! - **Registry**: the active timer pointer, self-healing and fail-open
//! - **Conflict**: navigate / discard / cancel when another session is running
//! - **Completion**: hands whole studied minutes to the progress service
//!
//! ## Key Components
//!
//! - [`StudyTimer`]: lifecycle of one study day's countdown
//! - [`ActiveTimerRegistry`]: the single-active-timer pointer
//! - [`ConflictResolver`]: enforcement point for the single-active-timer invariant
//! - [`CompletionHandler`]: at-most-once progress reporting

pub mod clock;
pub mod completion;
pub mod conflict;
pub mod error;
pub mod events;
pub mod progress;
pub mod registry;
pub mod storage;
pub mod study_day;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{CompletionHandler, CompletionOutcome};
pub use conflict::{ConflictChoice, ConflictResolver, Resolution};
pub use error::{ConfigError, CoreError, ReportingError, StorageError, TransitionError};
pub use events::Event;
pub use progress::{
    HttpProgressReporter, KeyringTokenProvider, ProgressReporter, StaticTokenProvider,
    TokenProvider,
};
pub use registry::{ActiveTimerPointer, ActiveTimerRegistry, ConflictCheck};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use study_day::StudyDay;
pub use timer::{
    EntryOutcome, ExpireOutcome, Finish, ReportStatus, RestoreOutcome, StartOutcome, StudyTimer,
    TimerContext, TimerPhase, TimerSession, WatchExit, WatchSignal,
};
