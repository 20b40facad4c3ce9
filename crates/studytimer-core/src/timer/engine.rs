//! Study timer engine.
//!
//! Drives one study day's countdown through its lifecycle, keeping the
//! durable record, the active timer pointer and the on-screen ticker in step.
//! Remaining time is always reconciled from the persisted anchor; the ticker
//! only smooths the display between resumes.
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = TimerContext::new(store, clock, completion);
//! let mut timer = ctx.timer(day);
//! match timer.enter().await? {
//!     EntryOutcome::Conflict(other) => { /* ask the user, then resolve_conflict() */ }
//!     EntryOutcome::Ready(_) => { timer.start().await?; }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, info, warn};

use super::reconcile::format_clock;
use super::state::{transition, TimerCommand, TimerPhase, Transition};
use super::ticker::{TickOutcome, VisualTicker};
use super::SessionStore;
use crate::clock::{to_datetime, Clock};
use crate::completion::{CompletionHandler, CompletionOutcome};
use crate::conflict::{ConflictChoice, ConflictResolver, Resolution};
use crate::error::{Result, TransitionError};
use crate::events::Event;
use crate::registry::{ActiveTimerPointer, ActiveTimerRegistry, ConflictCheck};
use crate::storage::KeyValueStore;
use crate::study_day::StudyDay;

/// Shared services every study timer is built from.
#[derive(Clone)]
pub struct TimerContext {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    completion: CompletionHandler,
}

impl TimerContext {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        completion: CompletionHandler,
    ) -> Self {
        Self {
            store,
            clock,
            completion,
        }
    }

    pub fn registry(&self) -> ActiveTimerRegistry {
        ActiveTimerRegistry::new(self.store.clone(), self.clock.clone())
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.store.clone())
    }

    pub fn resolver(&self) -> ConflictResolver {
        ConflictResolver::new(self.registry(), self.sessions(), self.clock.clone())
    }

    pub fn timer(&self, day: StudyDay) -> StudyTimer {
        StudyTimer {
            day,
            phase: TimerPhase::Idle,
            sessions: self.sessions(),
            registry: self.registry(),
            resolver: self.resolver(),
            completion: self.completion.clone(),
            clock: self.clock.clone(),
            ticker: VisualTicker::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    /// Less than one whole minute; nothing was sent.
    Skipped,
    Reported,
    /// User-visible failure. Local state is already cleared.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finish {
    pub credited_minutes: u64,
    pub report: ReportStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Stopped { remaining_secs: u64 },
    Running { remaining_secs: u64 },
    /// The countdown ran out while nobody was watching.
    Completed(Finish),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Ready(RestoreOutcome),
    Conflict(ActiveTimerPointer),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started { remaining_secs: u64 },
    Conflict(ActiveTimerPointer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireOutcome {
    Completed(Finish),
    /// The durable record still had time left; the display was corrected.
    Resynced { remaining_secs: u64 },
    /// The session was stopped or discarded elsewhere.
    Superseded,
}

/// Host lifecycle signals delivered to [`StudyTimer::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    /// The host returned to the foreground.
    Resume,
    Stop,
    /// The view is being torn down; the session keeps running durably.
    Detach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchExit {
    Completed(Finish),
    Stopped(Finish),
    Superseded,
    Detached,
    NotRunning,
}

/// One study day's countdown.
pub struct StudyTimer {
    day: StudyDay,
    phase: TimerPhase,
    sessions: SessionStore,
    registry: ActiveTimerRegistry,
    resolver: ConflictResolver,
    completion: CompletionHandler,
    clock: Arc<dyn Clock>,
    ticker: VisualTicker,
    events: Vec<Event>,
}

impl StudyTimer {
    // ── Queries ──────────────────────────────────────────────────────

    pub fn day(&self) -> &StudyDay {
        &self.day
    }

    pub fn session_id(&self) -> &str {
        &self.day.study_plan_day_id
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn ticker(&self) -> &VisualTicker {
        &self.ticker
    }

    /// Value on screen: the ticker's counter while armed, otherwise the
    /// reconciled value.
    pub fn remaining_secs(&self) -> u64 {
        self.ticker
            .display()
            .unwrap_or_else(|| self.phase.remaining_at(self.clock.now_ms()))
    }

    pub fn snapshot(&self) -> Event {
        let remaining = self.remaining_secs();
        Event::StateSnapshot {
            session_id: self.session_id().to_string(),
            subject: self.day.subject.clone(),
            state: self.phase,
            remaining_secs: remaining,
            display: format_clock(remaining),
            at: to_datetime(self.clock.now_ms()),
        }
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Screen entry: conflict check, then restore.
    pub async fn enter(&mut self) -> Result<EntryOutcome> {
        let id = self.session_id().to_string();
        match self.resolver.check(&id).await {
            ConflictCheck::Conflict(other) => {
                self.emit_conflict(&other);
                Ok(EntryOutcome::Conflict(other))
            }
            ConflictCheck::Clear => Ok(EntryOutcome::Ready(self.restore().await?)),
        }
    }

    /// Apply the user's answer to a conflict prompt.
    pub async fn resolve_conflict(
        &mut self,
        choice: ConflictChoice,
        other: &ActiveTimerPointer,
    ) -> Resolution {
        let resolution = self.resolver.resolve(choice, other).await;
        let at = self.at();
        self.events.push(Event::ConflictResolved {
            session_id: self.session_id().to_string(),
            choice,
            at,
        });
        resolution
    }

    /// Load the durable record and bring the phase and ticker in line with it.
    ///
    /// A missing, stopped or malformed record is reseeded from the study day.
    /// A running record whose time ran out completes immediately.
    pub async fn restore(&mut self) -> Result<RestoreOutcome> {
        self.ticker.cancel();
        let id = self.session_id().to_string();

        let record = match self.sessions.load(&id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(session_id = %id, error = %e, "failed to load timer record, reseeding from study day");
                None
            }
        };

        let now = self.clock.now_ms();
        match record {
            Some(record) if record.live_anchor().is_some() => {
                self.phase = TimerPhase::from_record(&record);
                let remaining = self.ticker.activate(&record, now);
                if remaining == 0 {
                    let t = transition(self.phase, TimerCommand::Expire, now)?;
                    return Ok(RestoreOutcome::Completed(self.finish_completed(t).await));
                }

                if self.registry.get_active().await.is_none() {
                    debug!(session_id = %id, "restoring missing active timer pointer");
                    self.registry
                        .set_active(&ActiveTimerPointer::for_session(&record, &self.day))
                        .await;
                }
                self.emit_resynced(remaining);
                Ok(RestoreOutcome::Running {
                    remaining_secs: remaining,
                })
            }
            _ => {
                let t = transition(
                    TimerPhase::Idle,
                    TimerCommand::Seed {
                        budget_secs: self.day.budget_secs(),
                    },
                    now,
                )?;
                self.phase = t.next;
                self.persist_phase().await;
                self.registry.release(&id).await;
                Ok(RestoreOutcome::Stopped {
                    remaining_secs: self.phase.remaining_at(now),
                })
            }
        }
    }

    /// Foreground resume: discard the ticker and re-read the durable record.
    pub async fn resume(&mut self) -> Result<RestoreOutcome> {
        self.restore().await
    }

    /// Stopped -> Running. The conflict check always runs again here.
    pub async fn start(&mut self) -> Result<StartOutcome> {
        let id = self.session_id().to_string();
        if let ConflictCheck::Conflict(other) = self.resolver.check(&id).await {
            self.emit_conflict(&other);
            return Ok(StartOutcome::Conflict(other));
        }

        let now = self.clock.now_ms();
        if self.phase == TimerPhase::Idle {
            self.phase = transition(
                self.phase,
                TimerCommand::Seed {
                    budget_secs: self.day.budget_secs(),
                },
                now,
            )?
            .next;
        }
        let t = transition(self.phase, TimerCommand::Start, now)?;
        self.phase = t.next;

        let record = self
            .phase
            .to_record(&id)
            .ok_or(TransitionError::NotRunning)?;
        if let Err(e) = self.sessions.save(&record).await {
            warn!(session_id = %record.session_id, error = %e, "failed to save timer record");
        }
        self.registry
            .set_active(&ActiveTimerPointer::for_session(&record, &self.day))
            .await;

        let remaining = self.ticker.activate(&record, now);
        info!(session_id = %record.session_id, remaining_secs = remaining, "timer started");
        let at = self.at();
        self.events.push(Event::TimerStarted {
            session_id: record.session_id.clone(),
            remaining_secs: remaining,
            anchor_ms: now,
            at,
        });
        Ok(StartOutcome::Started {
            remaining_secs: remaining,
        })
    }

    /// Running -> Stopped, crediting whole minutes elapsed.
    pub async fn stop(&mut self) -> Result<Finish> {
        // Cancel the ticker before any write so no tick can re-enter completion.
        self.ticker.cancel();
        let now = self.clock.now_ms();
        let t = transition(self.phase, TimerCommand::Stop, now)?;
        self.phase = t.next;

        self.persist_phase().await;
        self.registry.release(self.session_id()).await;

        let remaining = self.phase.remaining_at(now);
        info!(session_id = %self.session_id(), remaining_secs = remaining, credited_minutes = t.credited_minutes, "timer stopped");
        let at = self.at();
        self.events.push(Event::TimerStopped {
            session_id: self.session_id().to_string(),
            remaining_secs: remaining,
            credited_minutes: t.credited_minutes,
            at,
        });

        let report = self.report(t.credited_minutes).await;
        Ok(Finish {
            credited_minutes: t.credited_minutes,
            report,
        })
    }

    /// The ticker hit zero. Re-reconcile from the durable record before
    /// completing; the in-memory counter is never trusted on its own.
    pub async fn expire(&mut self) -> Result<ExpireOutcome> {
        self.ticker.cancel();
        let id = self.session_id().to_string();

        match self.sessions.load(&id).await {
            Ok(Some(record)) if record.live_anchor().is_some() => {
                self.phase = TimerPhase::from_record(&record);
            }
            Ok(_) => {
                info!(session_id = %id, "timer was stopped elsewhere");
                self.phase = TimerPhase::Stopped {
                    remaining_secs: self.day.budget_secs(),
                };
                return Ok(ExpireOutcome::Superseded);
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "failed to re-read timer record, using in-memory anchor");
            }
        }

        let now = self.clock.now_ms();
        match transition(self.phase, TimerCommand::Expire, now) {
            Ok(t) => Ok(ExpireOutcome::Completed(self.finish_completed(t).await)),
            Err(TransitionError::NotExpired { remaining_secs }) => {
                if let Some(record) = self.phase.to_record(&id) {
                    self.ticker.activate(&record, now);
                }
                self.emit_resynced(remaining_secs);
                Ok(ExpireOutcome::Resynced { remaining_secs })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// View torn down: stop ticking, leave the durable session alone.
    pub fn teardown(&mut self) {
        self.ticker.cancel();
    }

    /// Foreground countdown loop. Ticks once per `period`, reports each
    /// display value through `on_display`, and reacts to host signals until
    /// the session completes, stops, or the view detaches.
    ///
    /// A tick that finds the wall clock advanced by more than two periods
    /// means the host was suspended; it is handled like a foreground resume.
    pub async fn watch<F>(
        &mut self,
        period: Duration,
        mut signals: mpsc::Receiver<WatchSignal>,
        mut on_display: F,
    ) -> Result<WatchExit>
    where
        F: FnMut(u64),
    {
        if !self.phase.is_running() {
            return Ok(WatchExit::NotRunning);
        }
        if !self.ticker.is_armed() {
            if let Some(record) = self.phase.to_record(self.session_id()) {
                self.ticker.activate(&record, self.clock.now_ms());
            }
        }
        if let Some(secs) = self.ticker.display() {
            on_display(secs);
        }

        let wake_gap_ms = i64::try_from(period.as_millis())
            .unwrap_or(i64::MAX)
            .saturating_mul(2);
        let mut last_tick_ms = self.clock.now_ms();
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.clock.now_ms();
                    let gap_ms = now.saturating_sub(last_tick_ms);
                    last_tick_ms = now;
                    if gap_ms > wake_gap_ms {
                        info!(session_id = %self.session_id(), gap_ms, "wall clock jumped, resyncing from anchor");
                        if let Some(exit) = self.wake(&mut interval, &mut on_display).await? {
                            return Ok(exit);
                        }
                        last_tick_ms = self.clock.now_ms();
                        continue;
                    }
                    match self.ticker.tick() {
                        TickOutcome::Continue(secs) => on_display(secs),
                        TickOutcome::Expired => match self.expire().await? {
                            ExpireOutcome::Completed(finish) => {
                                on_display(0);
                                return Ok(WatchExit::Completed(finish));
                            }
                            ExpireOutcome::Resynced { remaining_secs } => on_display(remaining_secs),
                            ExpireOutcome::Superseded => return Ok(WatchExit::Superseded),
                        },
                        TickOutcome::Idle => return Ok(WatchExit::Detached),
                    }
                },
                signal = signals.recv() => match signal {
                    Some(WatchSignal::Resume) => {
                        if let Some(exit) = self.wake(&mut interval, &mut on_display).await? {
                            return Ok(exit);
                        }
                        last_tick_ms = self.clock.now_ms();
                    }
                    Some(WatchSignal::Stop) => return Ok(WatchExit::Stopped(self.stop().await?)),
                    Some(WatchSignal::Detach) | None => {
                        self.teardown();
                        return Ok(WatchExit::Detached);
                    }
                },
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Resume inside `watch`. `Some` ends the loop.
    async fn wake<F>(
        &mut self,
        interval: &mut Interval,
        on_display: &mut F,
    ) -> Result<Option<WatchExit>>
    where
        F: FnMut(u64),
    {
        match self.resume().await? {
            RestoreOutcome::Running { remaining_secs } => {
                interval.reset();
                on_display(remaining_secs);
                Ok(None)
            }
            RestoreOutcome::Completed(finish) => {
                on_display(0);
                Ok(Some(WatchExit::Completed(finish)))
            }
            RestoreOutcome::Stopped { .. } => Ok(Some(WatchExit::Superseded)),
        }
    }

    async fn finish_completed(&mut self, t: Transition) -> Finish {
        self.ticker.cancel();
        self.phase = t.next;
        self.persist_phase().await;
        self.registry.release(self.session_id()).await;

        info!(session_id = %self.session_id(), credited_minutes = t.credited_minutes, "timer completed");
        let at = self.at();
        self.events.push(Event::TimerCompleted {
            session_id: self.session_id().to_string(),
            credited_minutes: t.credited_minutes,
            at,
        });

        let report = self.report(t.credited_minutes).await;
        Finish {
            credited_minutes: t.credited_minutes,
            report,
        }
    }

    async fn report(&mut self, minutes: u64) -> ReportStatus {
        let id = self.session_id().to_string();
        match self.completion.finish(&id, minutes).await {
            Ok(CompletionOutcome::NothingToReport) => ReportStatus::Skipped,
            Ok(CompletionOutcome::Reported { minutes }) => {
                self.day.studied_minutes += minutes as f64;
                let at = self.at();
                self.events.push(Event::ProgressReported {
                    session_id: id,
                    minutes,
                    at,
                });
                ReportStatus::Reported
            }
            Err(e) => {
                let message = e.to_string();
                let at = self.at();
                self.events.push(Event::ProgressReportFailed {
                    session_id: id,
                    minutes,
                    message: message.clone(),
                    at,
                });
                ReportStatus::Failed(message)
            }
        }
    }

    /// Write the record implied by the current phase; completed sessions
    /// are deleted. Failures are logged and the session carries on.
    async fn persist_phase(&self) {
        let id = self.session_id();
        let result = match self.phase.to_record(id) {
            Some(record) => self.sessions.save(&record).await,
            None => self.sessions.delete(id).await,
        };
        if let Err(e) = result {
            warn!(session_id = %id, error = %e, "failed to persist timer record");
        }
    }

    fn emit_conflict(&mut self, other: &ActiveTimerPointer) {
        info!(session_id = %self.session_id(), other = %other.session_id, "another timer is active");
        let at = self.at();
        self.events.push(Event::ConflictDetected {
            session_id: self.session_id().to_string(),
            conflicting_session_id: other.session_id.clone(),
            conflicting_subject: other.subject().to_string(),
            at,
        });
    }

    fn emit_resynced(&mut self, remaining_secs: u64) {
        let at = self.at();
        self.events.push(Event::TimerResynced {
            session_id: self.session_id().to_string(),
            remaining_secs,
            at,
        });
    }

    fn at(&self) -> chrono::DateTime<chrono::Utc> {
        to_datetime(self.clock.now_ms())
    }
}
