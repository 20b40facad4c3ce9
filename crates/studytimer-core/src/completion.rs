//! Hands studied minutes to the progress reporting service.
//!
//! Local timer state is cleared before this runs, so a failed report is
//! surfaced to the caller and not retried: delivery is at most once.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::ReportingError;
use crate::progress::{ProgressReporter, TokenProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Zero whole minutes: no external call was made.
    NothingToReport,
    Reported { minutes: u64 },
}

#[derive(Clone)]
pub struct CompletionHandler {
    tokens: Arc<dyn TokenProvider>,
    reporter: Arc<dyn ProgressReporter>,
}

impl CompletionHandler {
    pub fn new(tokens: Arc<dyn TokenProvider>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { tokens, reporter }
    }

    /// Report `minutes` studied for `session_id`.
    ///
    /// # Errors
    /// `NotAuthenticated` when no token is available (the service is not
    /// called), or whatever the reporter returned.
    pub async fn finish(
        &self,
        session_id: &str,
        minutes: u64,
    ) -> Result<CompletionOutcome, ReportingError> {
        if minutes == 0 {
            return Ok(CompletionOutcome::NothingToReport);
        }

        let token = self
            .tokens
            .get_token()
            .await?
            .ok_or(ReportingError::NotAuthenticated)?;

        match self.reporter.report_progress(&token, session_id, minutes).await {
            Ok(()) => {
                info!(session_id, minutes, "progress reported");
                Ok(CompletionOutcome::Reported { minutes })
            }
            Err(e) => {
                error!(session_id, minutes, error = %e, "progress report failed, not retrying");
                Err(e)
            }
        }
    }
}
