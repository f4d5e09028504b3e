//! Engine-level error types.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors produced by an export run.
///
/// Webhook delivery failures are deliberately absent: they are recorded in
/// [`crate::ExportOutcome`] and never abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Setup errors ------

    /// Missing or invalid credentials, endpoints or settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No profile is registered under the requested name.
    #[error("unknown export profile '{0}'")]
    UnknownProfile(String),

    /// A profile failed validation when it was built or loaded.
    #[error("invalid export profile '{name}': {message}")]
    InvalidProfile { name: String, message: String },

    // ------ Run errors ------

    /// The driver could not open a session.
    #[error("connection error: {0}")]
    Connection(#[source] db::DbError),

    /// The export query failed.
    #[error("query error: {0}")]
    Query(#[source] db::DbError),

    /// The local export file could not be written.
    #[error("failed to write export file {}: {source}", .path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
