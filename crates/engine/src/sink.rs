//! Export Sink — local JSON file plus best-effort webhook.
//!
//! The file write is the only step that can fail an export. The webhook is
//! attempted afterwards and any failure is logged and recorded in the
//! [`ExportOutcome`], never returned.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};
use transform::ExportRecord;

use crate::EngineError;

/// Fixed upper bound for one webhook request.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a webhook delivery did not succeed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook timed out after {0:?}")]
    Timeout(Duration),

    #[error("webhook responded with status {0}")]
    Status(StatusCode),

    #[error("webhook request failed: {0}")]
    Network(String),
}

/// What one call to [`ExportSink::write`] achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub file_written: bool,
    pub file_path: PathBuf,
    pub webhook_attempted: bool,
    pub webhook_succeeded: bool,
    pub record_count: usize,
    /// Set when the webhook was attempted and failed.
    pub webhook_error: Option<String>,
}

/// Body POSTed to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub data: &'a [ExportRecord],
    pub service: &'a str,
    pub record_count: usize,
}

/// Writes export files and forwards records to webhooks.
#[derive(Debug, Clone)]
pub struct ExportSink {
    client: reqwest::Client,
    timeout: Duration,
}

impl ExportSink {
    /// Sink with the standard 30 second webhook timeout.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_timeout(WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    /// Write `records` to `destination`, then POST them to `webhook_url` if given.
    ///
    /// # Errors
    /// Only [`EngineError::ExportWrite`]; webhook problems are reported in
    /// the returned outcome.
    #[instrument(skip(self, records, destination, webhook_url), fields(records = records.len(), destination = %destination.display()))]
    pub async fn write(
        &self,
        service: &str,
        records: &[ExportRecord],
        destination: &Path,
        webhook_url: Option<&str>,
    ) -> Result<ExportOutcome, EngineError> {
        write_json_atomically(records, destination).await?;
        info!("Saved {} records to {}", records.len(), destination.display());

        let mut outcome = ExportOutcome {
            file_written: true,
            file_path: destination.to_path_buf(),
            webhook_attempted: false,
            webhook_succeeded: false,
            record_count: records.len(),
            webhook_error: None,
        };

        if let Some(url) = webhook_url {
            outcome.webhook_attempted = true;
            info!("Sending data to {} endpoint: {}", service, url);

            let payload = WebhookPayload { data: records, service, record_count: records.len() };
            match self.post(url, &payload).await {
                Ok(status) => {
                    info!("Successfully sent data to {} endpoint. Status: {}", service, status);
                    outcome.webhook_succeeded = true;
                }
                Err(e) => {
                    error!("Failed to send data to {} endpoint: {}", service, e);
                    outcome.webhook_error = Some(e.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// POST `payload` as JSON; any non-2xx status is an error.
    pub async fn post(&self, url: &str, payload: &WebhookPayload<'_>) -> Result<StatusCode, WebhookError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(WebhookError::Status(status))
        }
    }

    fn classify(&self, e: reqwest::Error) -> WebhookError {
        if e.is_timeout() {
            WebhookError::Timeout(self.timeout)
        } else {
            WebhookError::Network(e.to_string())
        }
    }
}

/// Serialise to a temp file beside `destination`, then rename over it so a
/// reader sees either the previous file or the complete new one.
async fn write_json_atomically(records: &[ExportRecord], destination: &Path) -> Result<(), EngineError> {
    let path = destination.to_path_buf();
    let write_error = |source: std::io::Error| EngineError::ExportWrite { path: path.clone(), source };

    let bytes = serde_json::to_vec_pretty(records).map_err(|e| write_error(std::io::Error::other(e)))?;
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| write_error(std::io::Error::other(e)))?
    .map_err(write_error)
}
