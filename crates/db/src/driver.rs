//! The `DatabaseDriver` and `Connection` traits.
//!
//! The connector is written against these traits only. [`crate::SqlxDriver`]
//! is the production implementation; [`crate::mock::MockDriver`] is the test
//! double.

use async_trait::async_trait;

use crate::{ConnectionConfig, DbError, ResultSet, ScalarValue};

/// Factory for live sessions against one database technology.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Short label used in log fields.
    fn name(&self) -> &str;

    /// Open a new session.
    ///
    /// # Errors
    /// [`DbError::UnknownDriver`] when `config.driver()` is not handled, or
    /// [`DbError::Connection`] when the backend refuses the session.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>, DbError>;
}

/// One live database session.
///
/// After [`Connection::close`] every statement fails with
/// [`DbError::NotConnected`]; closing twice is a no-op.
#[async_trait]
pub trait Connection: Send {
    /// Run a row-returning statement and materialise every row.
    async fn query(&mut self, sql: &str, params: &[ScalarValue]) -> Result<ResultSet, DbError>;

    /// Run a write statement in its own transaction and return the
    /// affected row count. Commits on success, rolls back on failure.
    async fn execute(&mut self, sql: &str, params: &[ScalarValue]) -> Result<u64, DbError>;

    async fn close(&mut self);

    fn is_open(&self) -> bool;
}
