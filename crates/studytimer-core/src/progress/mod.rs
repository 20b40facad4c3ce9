//! External collaborators used when a session finishes: a bearer token
//! source and the progress reporting service.

pub mod http;
pub mod token;

pub use http::HttpProgressReporter;
pub use token::{KeyringTokenProvider, StaticTokenProvider};

use async_trait::async_trait;

use crate::error::ReportingError;

/// Resolves the bearer token for authenticated calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// `Ok(None)` means the user is not signed in.
    async fn get_token(&self) -> Result<Option<String>, ReportingError>;
}

/// Accepts studied-minute increments for a study session.
///
/// The increment is additive on the server side.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report_progress(
        &self,
        token: &str,
        session_id: &str,
        studied_minutes: u64,
    ) -> Result<(), ReportingError>;
}
