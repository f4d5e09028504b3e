//! Typed error type for the db crate.

use thiserror::Error;

/// Errors raised while opening a connection or running a statement.
///
/// Messages never carry the password; driver errors are stringified after
/// the connection string has been redacted.
#[derive(Debug, Error)]
pub enum DbError {
    /// The driver name does not map to any backend this build supports.
    #[error("unrecognised database driver: '{0}'")]
    UnknownDriver(String),

    /// The driver rejected the credentials or could not reach the host.
    #[error("connection failed ({target}): {message}")]
    Connection { target: String, message: String },

    /// A statement was issued without an open connection.
    #[error("no active connection; open one before running statements")]
    NotConnected,

    /// The driver reported a syntax, semantic or constraint failure.
    #[error("query failed: {0}")]
    Query(String),

    /// A write statement failed and its transaction was rolled back.
    #[error("write failed and was rolled back: {0}")]
    WriteRolledBack(String),
}

impl DbError {
    /// True for every variant that happens before a session exists.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::UnknownDriver(_) | Self::Connection { .. })
    }
}
