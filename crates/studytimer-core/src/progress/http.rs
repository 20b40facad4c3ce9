//! Progress reporting over the study-plan REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::ProgressReporter;
use crate::error::ReportingError;

/// `PATCH {base}/study-plan-day/{id}/progress` with `{"studied_minutes": n}`.
#[derive(Debug, Clone)]
pub struct HttpProgressReporter {
    client: Client,
    base_url: Url,
}

impl HttpProgressReporter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReportingError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, session_id: &str) -> Result<Url, ReportingError> {
        Ok(self.base_url.join(&format!(
            "study-plan-day/{}/progress",
            urlencoding::encode(session_id)
        ))?)
    }
}

#[async_trait]
impl ProgressReporter for HttpProgressReporter {
    async fn report_progress(
        &self,
        token: &str,
        session_id: &str,
        studied_minutes: u64,
    ) -> Result<(), ReportingError> {
        let resp = self
            .client
            .patch(self.endpoint(session_id)?)
            .bearer_auth(token)
            .json(&json!({ "studied_minutes": studied_minutes }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportingError::Rejected { status, body });
        }
        Ok(())
    }
}
