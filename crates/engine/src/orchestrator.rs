//! Export orchestrator.
//!
//! `ExportOrchestrator` runs one profile end to end:
//! 1. Resolves the connection config and webhook endpoint (fails before any I/O).
//! 2. Opens a scoped connection.
//! 3. Runs the profile query and materialises the result set.
//! 4. Applies the brand filter and the profile's row transformer.
//! 5. Hands the records to the export sink.
//!
//! The connection is closed on every exit path before `run` returns. A file
//! written by step 5 is left in place even if a later step fails.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use db::{Connection, ConnectionManager, DatabaseDriver, Row, ScopedWork};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::config::{AppConfig, ENDPOINT_SUFFIX};
use crate::profile::{ExportProfile, WebhookPolicy};
use crate::sink::{ExportOutcome, ExportSink};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Linear run states. `Failed` is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Connecting,
    Querying,
    Transforming,
    Exporting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Querying => write!(f, "querying"),
            Self::Transforming => write!(f, "transforming"),
            Self::Exporting => write!(f, "exporting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks the current stage and logs transitions.
#[derive(Debug)]
struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        Self { current: Stage::Idle }
    }

    fn enter(&mut self, next: Stage) {
        info!(from = %self.current, to = %next, "export stage");
        self.current = next;
    }

    /// Record a failure in the current stage and move to `Failed`.
    fn fail(&mut self, err: &EngineError) -> Stage {
        let failed_in = self.current;
        error!(stage = %failed_in, error = %err, "export step failed");
        self.current = Stage::Failed;
        failed_in
    }
}

// ---------------------------------------------------------------------------
// Run inputs / outputs
// ---------------------------------------------------------------------------

/// Per-run options supplied by the trigger.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Keep only rows whose brand column equals this value.
    pub brand_filter: Option<String>,
}

/// The result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub profile: String,
    pub stage: Stage,
    pub outcome: ExportOutcome,
    pub brand_filter: Option<String>,
}

// ---------------------------------------------------------------------------
// ExportOrchestrator
// ---------------------------------------------------------------------------

/// Sequences connector → query → transform → sink for one profile.
///
/// Holds only shareable, stateless parts. Every call to [`run`] builds its
/// own [`ConnectionManager`], so concurrent triggers never share a session.
///
/// [`run`]: ExportOrchestrator::run
#[derive(Clone)]
pub struct ExportOrchestrator {
    driver: Arc<dyn DatabaseDriver>,
    sink: ExportSink,
}

impl ExportOrchestrator {
    pub fn new(driver: Arc<dyn DatabaseDriver>, sink: ExportSink) -> Self {
        Self { driver, sink }
    }

    /// Run `profile` against the warehouse described by `config`.
    ///
    /// # Errors
    /// Configuration, connection, query or export-write failures. The
    /// session, if one was opened, is already closed when this returns.
    #[instrument(skip_all, fields(profile = %profile.name))]
    pub async fn run(
        &self,
        profile: &ExportProfile,
        config: &AppConfig,
        options: &RunOptions,
    ) -> Result<ExportReport, EngineError> {
        let mut tracker = StageTracker::new();
        info!("Starting {} export process", profile.name);

        let setup = resolve_webhook(profile, config)
            .and_then(|url| config.connection_config().map(|cfg| (url, cfg)));
        let (webhook_url, db_config) = match setup {
            Ok(ok) => ok,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };

        let mut manager = ConnectionManager::new(Arc::clone(&self.driver), db_config);
        tracker.enter(Stage::Connecting);

        let pipeline = Pipeline {
            profile,
            options,
            sink: &self.sink,
            webhook_url: webhook_url.as_deref(),
            tracker: &mut tracker,
        };

        let result = match manager.scoped(pipeline).await {
            Ok(inner) => inner,
            Err(e) => Err(EngineError::Connection(e)),
        };

        match result {
            Ok(outcome) => {
                tracker.enter(Stage::Done);
                info!("{} export completed successfully", profile.name);
                Ok(ExportReport {
                    profile: profile.name.clone(),
                    stage: Stage::Done,
                    outcome,
                    brand_filter: options.brand_filter.clone(),
                })
            }
            Err(e) => {
                tracker.fail(&e);
                Err(e)
            }
        }
    }
}

/// Endpoint for `profile` according to its webhook policy.
fn resolve_webhook(profile: &ExportProfile, config: &AppConfig) -> Result<Option<String>, EngineError> {
    let configured = config.webhook_url(&profile.name);
    match (profile.webhook, configured) {
        (WebhookPolicy::None, _) => Ok(None),
        (WebhookPolicy::Optional, None) => {
            info!("No webhook endpoint configured for {}; exporting locally only", profile.name);
            Ok(None)
        }
        (WebhookPolicy::Required, None) => Err(EngineError::Configuration(format!(
            "No endpoint configured for {}. Please set {}{} in your .env file",
            profile.name,
            profile.name.to_ascii_uppercase(),
            ENDPOINT_SUFFIX
        ))),
        (_, Some(url)) => reqwest::Url::parse(url)
            .map(|_| Some(url.to_owned()))
            .map_err(|e| {
                EngineError::Configuration(format!("invalid webhook endpoint for {}: {e}", profile.name))
            }),
    }
}

/// Keep rows whose `column` text equals `brand`.
fn filter_by_brand(rows: Vec<Row>, column: &str, brand: &str) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| row.get(column).and_then(|v| v.as_text()).as_deref() == Some(brand))
        .collect()
}

/// The part of a run that needs a live connection.
struct Pipeline<'a> {
    profile: &'a ExportProfile,
    options: &'a RunOptions,
    sink: &'a ExportSink,
    webhook_url: Option<&'a str>,
    tracker: &'a mut StageTracker,
}

#[async_trait]
impl ScopedWork for Pipeline<'_> {
    type Output = Result<ExportOutcome, EngineError>;

    async fn run(self, conn: &mut dyn Connection) -> Self::Output {
        let profile = self.profile;

        self.tracker.enter(Stage::Querying);
        let result = db::manager::execute(conn, &profile.query, &profile.params)
            .await
            .map_err(EngineError::Query)?;
        info!("Retrieved {} records from database", result.len());

        self.tracker.enter(Stage::Transforming);
        let mut rows = result.into_rows();
        if let Some(brand) = &self.options.brand_filter {
            match &profile.brand_column {
                Some(column) => {
                    info!("Filtering by brand: {}", brand);
                    rows = filter_by_brand(rows, column, brand);
                }
                None => warn!("Profile {} has no brand column; ignoring brand filter", profile.name),
            }
        }
        let records = profile.transformer().transform_all(&rows);

        self.tracker.enter(Stage::Exporting);
        self.sink
            .write(&profile.name, &records, &profile.output_path, self.webhook_url)
            .await
    }
}
