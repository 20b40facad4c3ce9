//! The persisted countdown record and its store adapter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::reconcile;
use crate::error::StorageError;
use crate::storage::{load_json, save_json, session_key, KeyValueStore};

/// Serializable unit of truth for one countdown, stored under
/// `timer_{sessionId}`.
///
/// Remaining time is never stored incrementally: while active it is always
/// recomputed from `anchor_timestamp` and `initial_remaining_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub session_id: String,
    pub anchor_timestamp: Option<i64>,
    pub initial_remaining_seconds: u64,
    pub is_active: bool,
}

impl TimerSession {
    /// A stopped record holding `remaining_secs`.
    pub fn stopped(session_id: impl Into<String>, remaining_secs: u64) -> Self {
        Self {
            session_id: session_id.into(),
            anchor_timestamp: None,
            initial_remaining_seconds: remaining_secs,
            is_active: false,
        }
    }

    /// A running record anchored at `anchor_ms`.
    pub fn running(session_id: impl Into<String>, anchor_ms: i64, remaining_secs: u64) -> Self {
        Self {
            session_id: session_id.into(),
            anchor_timestamp: Some(anchor_ms),
            initial_remaining_seconds: remaining_secs,
            is_active: true,
        }
    }

    /// Anchor of a well-formed active record. An active record without an
    /// anchor violates the record invariant and is reported as `None`.
    pub fn live_anchor(&self) -> Option<i64> {
        if self.is_active {
            self.anchor_timestamp
        } else {
            None
        }
    }

    /// Reconciled remaining seconds at `now_ms`; the stored budget when stopped.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match self.live_anchor() {
            Some(anchor) => {
                reconcile::remaining_seconds(anchor, self.initial_remaining_seconds, now_ms)
            }
            None => self.initial_remaining_seconds,
        }
    }
}

/// Reads and writes `TimerSession` records.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, session_id: &str) -> Result<Option<TimerSession>, StorageError> {
        load_json(self.store.as_ref(), &session_key(session_id)).await
    }

    pub async fn save(&self, session: &TimerSession) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), &session_key(&session.session_id), session).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        self.store.delete(&session_key(session_id)).await
    }
}
