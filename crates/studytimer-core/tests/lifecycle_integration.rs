//! Integration tests for the study timer lifecycle.

mod common;

use common::{BrokenStore, Harness, RecordingReporter, T0};
use std::sync::Arc;
use studytimer_core::{
    EntryOutcome, Event, ExpireOutcome, Finish, ReportStatus, RestoreOutcome, StartOutcome,
    TimerPhase, TransitionError, CoreError,
};

#[tokio::test]
async fn test_first_entry_seeds_record_from_study_day() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 30, 10.7);

    let outcome = timer.enter().await.unwrap();
    assert_eq!(
        outcome,
        EntryOutcome::Ready(RestoreOutcome::Stopped { remaining_secs: 1200 })
    );

    let record = h.ctx.sessions().load("d1").await.unwrap().unwrap();
    assert!(!record.is_active);
    assert_eq!(record.anchor_timestamp, None);
    assert_eq!(record.initial_remaining_seconds, 1200);
}

#[tokio::test]
async fn test_start_writes_record_and_pointer() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 30, 0.0);
    timer.enter().await.unwrap();

    h.advance_secs(5);
    let started = timer.start().await.unwrap();
    assert_eq!(started, StartOutcome::Started { remaining_secs: 1800 });

    let record = h.ctx.sessions().load("d1").await.unwrap().unwrap();
    assert!(record.is_active);
    assert_eq!(record.anchor_timestamp, Some(T0 + 5_000));
    assert_eq!(record.initial_remaining_seconds, 1800);

    let pointer = h.ctx.registry().get_active().await.unwrap();
    assert_eq!(pointer.session_id, "d1");
    assert_eq!(pointer.anchor_timestamp, Some(T0 + 5_000));
    assert_eq!(pointer.display_payload.subject, "Subject d1");
    assert!(timer.ticker().is_armed());
}

#[tokio::test]
async fn test_stop_after_ninety_seconds_credits_one_minute() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 2, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();

    h.advance_secs(90);
    let finish = timer.stop().await.unwrap();
    assert_eq!(
        finish,
        Finish {
            credited_minutes: 1,
            report: ReportStatus::Reported
        }
    );
    assert_eq!(h.reporter.calls(), vec![("d1".to_string(), 1)]);
    assert_eq!(timer.phase(), TimerPhase::Stopped { remaining_secs: 30 });
    assert!(!timer.ticker().is_armed());

    let record = h.ctx.sessions().load("d1").await.unwrap().unwrap();
    assert!(!record.is_active);
    assert_eq!(record.anchor_timestamp, None);
    assert!(h.ctx.registry().get_active().await.is_none());
}

#[tokio::test]
async fn test_zero_minute_stop_makes_no_report() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 30, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();

    h.advance_secs(30);
    let finish = timer.stop().await.unwrap();
    assert_eq!(finish.credited_minutes, 0);
    assert_eq!(finish.report, ReportStatus::Skipped);
    assert!(h.reporter.calls().is_empty());
    assert!(h.ctx.registry().get_active().await.is_none());
}

#[tokio::test]
async fn test_natural_completion_credits_rounded_up_budget() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 30, 28.5);
    timer.enter().await.unwrap();
    // 30 - floor(28.5) leaves a two minute budget; study 30s and stop.
    assert_eq!(timer.remaining_secs(), 120);
    timer.start().await.unwrap();
    h.advance_secs(30);
    timer.stop().await.unwrap();

    // Restart from the 90 seconds still displayed.
    assert_eq!(timer.remaining_secs(), 90);
    timer.start().await.unwrap();
    h.advance_secs(90);

    let outcome = timer.expire().await.unwrap();
    assert_eq!(
        outcome,
        ExpireOutcome::Completed(Finish {
            credited_minutes: 2,
            report: ReportStatus::Reported
        })
    );
    assert_eq!(h.reporter.calls(), vec![("d1".to_string(), 2)]);
    assert!(h.ctx.sessions().load("d1").await.unwrap().is_none());
    assert!(h.ctx.registry().get_active().await.is_none());
}

#[tokio::test]
async fn test_early_expiry_resyncs_instead_of_completing() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 10, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();

    h.advance_secs(100);
    let outcome = timer.expire().await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Resynced { remaining_secs: 500 });
    assert_eq!(timer.ticker().display(), Some(500));
    assert!(h.reporter.calls().is_empty());
}

#[tokio::test]
async fn test_expiry_after_stop_elsewhere_is_superseded() {
    let h = Harness::new();
    let mut screen_a = h.timer("d1", 10, 0.0);
    screen_a.enter().await.unwrap();
    screen_a.start().await.unwrap();

    let mut screen_b = h.timer("d1", 10, 0.0);
    screen_b.enter().await.unwrap();
    h.advance_secs(120);
    screen_b.stop().await.unwrap();

    assert_eq!(screen_a.expire().await.unwrap(), ExpireOutcome::Superseded);
    assert_eq!(h.reporter.calls(), vec![("d1".to_string(), 2)]);
}

#[tokio::test]
async fn test_illegal_transitions_are_errors_without_side_effects() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 10, 0.0);
    timer.enter().await.unwrap();

    assert!(matches!(
        timer.stop().await,
        Err(CoreError::Transition(TransitionError::NotRunning))
    ));
    timer.start().await.unwrap();
    assert!(matches!(
        timer.start().await,
        Err(CoreError::Transition(TransitionError::AlreadyRunning))
    ));
    assert!(h.reporter.calls().is_empty());
}

#[tokio::test]
async fn test_fully_studied_day_cannot_start() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 10, 10.0);
    timer.enter().await.unwrap();
    assert!(matches!(
        timer.start().await,
        Err(CoreError::Transition(TransitionError::NothingRemaining))
    ));
    assert!(h.ctx.registry().get_active().await.is_none());
}

#[tokio::test]
async fn test_report_failure_is_surfaced_and_local_state_cleared() {
    let h = Harness::with(
        Arc::new(studytimer_core::MemoryStore::new()),
        RecordingReporter::failing(),
        Some("tok"),
    );
    let mut timer = h.timer("d1", 5, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();
    h.advance_secs(180);

    let finish = timer.stop().await.unwrap();
    assert!(matches!(finish.report, ReportStatus::Failed(_)));
    assert_eq!(h.reporter.calls().len(), 1);
    assert!(h.ctx.registry().get_active().await.is_none());

    let events = timer.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ProgressReportFailed { minutes: 3, .. })));
}

#[tokio::test]
async fn test_missing_token_stops_reporting() {
    let h = Harness::with(
        Arc::new(studytimer_core::MemoryStore::new()),
        RecordingReporter::default(),
        None,
    );
    let mut timer = h.timer("d1", 5, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();
    h.advance_secs(120);

    let finish = timer.stop().await.unwrap();
    assert!(matches!(finish.report, ReportStatus::Failed(_)));
    assert!(h.reporter.calls().is_empty());
}

#[tokio::test]
async fn test_broken_store_degrades_to_seeded_budget() {
    let h = Harness::with(Arc::new(BrokenStore), RecordingReporter::default(), Some("tok"));
    let mut timer = h.timer("d1", 25, 5.0);

    let outcome = timer.enter().await.unwrap();
    assert_eq!(
        outcome,
        EntryOutcome::Ready(RestoreOutcome::Stopped { remaining_secs: 1200 })
    );
    // Writes fail but the session still runs in memory.
    assert!(matches!(
        timer.start().await.unwrap(),
        StartOutcome::Started { remaining_secs: 1200 }
    ));
    h.advance_secs(61);
    assert_eq!(timer.stop().await.unwrap().credited_minutes, 1);
}

#[tokio::test]
async fn test_events_follow_lifecycle_order() {
    let h = Harness::new();
    let mut timer = h.timer("d1", 1, 0.0);
    timer.enter().await.unwrap();
    timer.start().await.unwrap();
    h.advance_secs(60);
    timer.expire().await.unwrap();

    let kinds: Vec<&'static str> = timer
        .drain_events()
        .iter()
        .map(|e| match e {
            Event::TimerStarted { .. } => "started",
            Event::TimerCompleted { .. } => "completed",
            Event::ProgressReported { .. } => "reported",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["started", "completed", "reported"]);
    assert!(timer.drain_events().is_empty());
}
