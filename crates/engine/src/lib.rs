//! `engine` crate — export profiles, the export sink and the orchestrator.
//!
//! Ties the warehouse connector (`db`) to the row transformers
//! (`transform`) and owns the only side effects of an export: the local
//! JSON file and the webhook POST.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod sink;

pub use config::AppConfig;
pub use error::EngineError;
pub use orchestrator::{ExportOrchestrator, ExportReport, RunOptions, Stage};
pub use profile::{ExportProfile, ProfileRegistry, TransformSpec, WebhookPolicy};
pub use sink::{ExportOutcome, ExportSink, WebhookError, WEBHOOK_TIMEOUT};
