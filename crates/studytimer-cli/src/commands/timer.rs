use clap::{Args, Subcommand, ValueEnum};
use studytimer_core::timer::format_clock;
use studytimer_core::{
    ActiveTimerPointer, Clock, Config, ConflictChoice, EntryOutcome, Resolution, RestoreOutcome,
    StartOutcome, StudyDay, StudyTimer, SystemClock, WatchExit, WatchSignal,
};
use tokio::sync::mpsc;

use crate::context;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The study-plan day the timer belongs to.
#[derive(Args, Debug, Clone)]
pub struct DayArgs {
    /// Study plan day ID
    #[arg(long = "day")]
    pub id: String,
    /// Subject shown on the banner
    #[arg(long, default_value = "")]
    pub subject: String,
    /// Minutes allocated for the day
    #[arg(long)]
    pub allocated: u32,
    /// Minutes already studied (server total)
    #[arg(long, default_value = "0")]
    pub studied: f64,
}

impl DayArgs {
    fn into_day(self) -> StudyDay {
        StudyDay::new(self.id, self.subject, self.allocated, self.studied)
    }
}

/// Answer to the "another timer is running" prompt.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OnConflict {
    /// Report the other session and do nothing
    Navigate,
    /// Discard the other session and continue
    Discard,
    /// Abort
    Cancel,
}

impl From<OnConflict> for ConflictChoice {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Navigate => ConflictChoice::NavigateToOther,
            OnConflict::Discard => ConflictChoice::DiscardOther,
            OnConflict::Cancel => ConflictChoice::Cancel,
        }
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Open a day's timer and print its state as JSON
    Status {
        #[command(flatten)]
        day: DayArgs,
        #[arg(long, value_enum, default_value = "cancel")]
        on_conflict: OnConflict,
    },
    /// Start the countdown
    Start {
        #[command(flatten)]
        day: DayArgs,
        #[arg(long, value_enum, default_value = "cancel")]
        on_conflict: OnConflict,
    },
    /// Stop the countdown and report whole minutes studied
    Stop {
        #[command(flatten)]
        day: DayArgs,
    },
    /// Re-derive the countdown from its persisted anchor
    Resume {
        #[command(flatten)]
        day: DayArgs,
    },
    /// Print the globally active timer, if any
    Active,
    /// Follow a running countdown until it completes
    Watch {
        #[command(flatten)]
        day: DayArgs,
        /// Stop the session on Ctrl-C instead of detaching
        #[arg(long)]
        stop_on_interrupt: bool,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn flush_events(timer: &mut StudyTimer) -> CliResult {
    for event in timer.drain_events() {
        print_json(&event)?;
    }
    Ok(())
}

/// Where the entry flow left the screen.
enum Entry {
    Ready,
    /// The user chose to go to the running session instead.
    Navigate(ActiveTimerPointer),
    /// The user cancelled; another session keeps running.
    Abort(ActiveTimerPointer),
}

/// Run the entry flow, resolving a conflict with `choice`.
async fn enter(
    timer: &mut StudyTimer,
    choice: OnConflict,
) -> Result<Entry, Box<dyn std::error::Error>> {
    let other = match timer.enter().await? {
        EntryOutcome::Ready(_) => return Ok(Entry::Ready),
        EntryOutcome::Conflict(other) => other,
    };

    Ok(match timer.resolve_conflict(choice.into(), &other).await {
        Resolution::Proceed => {
            timer.restore().await?;
            Entry::Ready
        }
        Resolution::Navigate(other) => Entry::Navigate(other),
        Resolution::Abort => Entry::Abort(other),
    })
}

fn conflict_error(other: &ActiveTimerPointer) -> Box<dyn std::error::Error> {
    format!(
        "another timer is running for {} ({})",
        other.subject(),
        other.session_id
    )
    .into()
}

fn print_banner(pointer: &ActiveTimerPointer) -> CliResult {
    print_json(&serde_json::json!({
        "type": "ActiveTimer",
        "session_id": pointer.session_id,
        "subject": pointer.subject(),
        "remaining_secs": pointer.remaining_at(SystemClock.now_ms()),
    }))
}

pub async fn run(action: TimerAction) -> CliResult {
    let config = Config::load_or_default();
    let ctx = context::build(&config)?;

    match action {
        TimerAction::Status { day, on_conflict } => {
            let mut timer = ctx.timer(day.into_day());
            let entry = enter(&mut timer, on_conflict).await?;
            flush_events(&mut timer)?;
            match entry {
                Entry::Navigate(other) => print_banner(&other)?,
                Entry::Ready | Entry::Abort(_) => print_json(&timer.snapshot())?,
            }
        }
        TimerAction::Start { day, on_conflict } => {
            let mut timer = ctx.timer(day.into_day());
            let entry = enter(&mut timer, on_conflict).await?;
            let outcome = match entry {
                Entry::Ready => Some(timer.start().await?),
                Entry::Navigate(_) | Entry::Abort(_) => None,
            };
            flush_events(&mut timer)?;
            match (entry, outcome) {
                (Entry::Navigate(other), _) => print_banner(&other)?,
                (Entry::Abort(other), _) | (_, Some(StartOutcome::Conflict(other))) => {
                    return Err(conflict_error(&other));
                }
                _ => print_json(&timer.snapshot())?,
            }
        }
        TimerAction::Stop { day } => {
            let mut timer = ctx.timer(day.into_day());
            match timer.restore().await? {
                RestoreOutcome::Running { .. } => {
                    timer.stop().await?;
                }
                RestoreOutcome::Stopped { .. } => {
                    return Err("timer is not running".into());
                }
                RestoreOutcome::Completed(_) => {}
            }
            flush_events(&mut timer)?;
            print_json(&timer.snapshot())?;
        }
        TimerAction::Resume { day } => {
            let mut timer = ctx.timer(day.into_day());
            timer.resume().await?;
            flush_events(&mut timer)?;
            print_json(&timer.snapshot())?;
        }
        TimerAction::Active => match ctx.registry().check_for_active().await {
            Some(pointer) => print_banner(&pointer)?,
            None => println!("null"),
        },
        TimerAction::Watch {
            day,
            stop_on_interrupt,
        } => {
            let mut timer = ctx.timer(day.into_day());
            timer.restore().await?;
            flush_events(&mut timer)?;

            let (tx, rx) = mpsc::channel(1);
            let interrupt = if stop_on_interrupt {
                WatchSignal::Stop
            } else {
                WatchSignal::Detach
            };
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = tx.send(interrupt).await;
                }
            });

            let exit = timer
                .watch(config.tick_interval(), rx, |secs| {
                    eprintln!("{}", format_clock(secs));
                })
                .await?;
            flush_events(&mut timer)?;
            if exit == WatchExit::NotRunning {
                return Err("timer is not running".into());
            }
            print_json(&timer.snapshot())?;
        }
    }
    Ok(())
}
