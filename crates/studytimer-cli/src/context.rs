//! Wires core services from the user's configuration.

use std::sync::Arc;

use studytimer_core::storage::StorageBackend;
use studytimer_core::{
    CompletionHandler, Config, HttpProgressReporter, KeyValueStore, KeyringTokenProvider,
    MemoryStore, SqliteStore, StaticTokenProvider, SystemClock, TimerContext, TokenProvider,
};
use tracing::debug;

/// Overrides the keyring, for headless machines.
pub const TOKEN_ENV: &str = "STUDYTIMER_TOKEN";

pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn KeyValueStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open()?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

pub fn token_provider() -> Arc<dyn TokenProvider> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.is_empty() => {
            debug!("using token from {TOKEN_ENV}");
            Arc::new(StaticTokenProvider::new(Some(token)))
        }
        _ => Arc::new(KeyringTokenProvider::new()),
    }
}

pub fn build(config: &Config) -> Result<TimerContext, Box<dyn std::error::Error>> {
    let reporter = HttpProgressReporter::new(&config.api.base_url, config.request_timeout())?;
    let completion = CompletionHandler::new(token_provider(), Arc::new(reporter));
    Ok(TimerContext::new(
        open_store(config)?,
        Arc::new(SystemClock),
        completion,
    ))
}
