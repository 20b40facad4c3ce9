//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use studytimer_core::error::{ReportingError, StorageError};
use studytimer_core::{
    CompletionHandler, KeyValueStore, ManualClock, MemoryStore, ProgressReporter,
    StaticTokenProvider, StudyDay, StudyTimer, TimerContext,
};

pub const T0: i64 = 1_700_000_000_000;

/// Records every report; optionally fails them all.
#[derive(Default)]
pub struct RecordingReporter {
    pub calls: Mutex<Vec<(String, u64)>>,
    pub fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn report_progress(
        &self,
        _token: &str,
        session_id: &str,
        studied_minutes: u64,
    ) -> Result<(), ReportingError> {
        self.calls
            .lock()
            .unwrap()
            .push((session_id.to_string(), studied_minutes));
        if self.fail {
            return Err(ReportingError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::ReadFailed {
            key: key.to_string(),
            message: "disk on fire".into(),
        })
    }

    async fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteFailed {
            key: key.to_string(),
            message: "disk on fire".into(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteFailed {
            key: key.to_string(),
            message: "disk on fire".into(),
        })
    }
}

pub struct Harness {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
    pub reporter: Arc<RecordingReporter>,
    pub ctx: TimerContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Arc::new(MemoryStore::new()), RecordingReporter::default(), Some("tok"))
    }

    pub fn with(
        store: Arc<dyn KeyValueStore>,
        reporter: RecordingReporter,
        token: Option<&str>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let reporter = Arc::new(reporter);
        let tokens = Arc::new(StaticTokenProvider::new(token.map(str::to_string)));
        let completion = CompletionHandler::new(tokens, reporter.clone());
        let ctx = TimerContext::new(store.clone(), clock.clone(), completion);
        Self {
            store,
            clock,
            reporter,
            ctx,
        }
    }

    pub fn timer(&self, id: &str, allocated_minutes: u32, studied_minutes: f64) -> StudyTimer {
        self.ctx
            .timer(StudyDay::new(id, format!("Subject {id}"), allocated_minutes, studied_minutes))
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(std::time::Duration::from_secs(secs));
    }
}
