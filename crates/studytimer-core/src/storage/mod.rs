mod config;
pub mod memory;
pub mod sqlite;

pub use config::{ApiConfig, Config, StorageBackend, StorageConfig, TimerConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, StorageError};

/// Key of the process-wide active timer pointer.
pub const ACTIVE_TIMER_KEY: &str = "active_timer_global";

/// Key of the per-session countdown record.
pub fn session_key(session_id: &str) -> String {
    format!("timer_{session_id}")
}

/// Durable string-keyed store. Values are JSON documents.
///
/// Every call may suspend until the backend answers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON record.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write a JSON record.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::WriteFailed {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &raw).await
}

/// Returns `~/.config/studytimer[-dev]/` based on STUDYTIMER_ENV.
///
/// Set STUDYTIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studytimer-dev")
    } else {
        base_dir.join("studytimer")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
