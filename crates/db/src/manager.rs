//! Connection Manager and Query Executor.
//!
//! A `ConnectionManager` owns at most one live session. `open`/`close` give
//! manual control; [`ConnectionManager::scoped`] is the acquire-use-release
//! form that closes the session on success, on error and on panic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{info, instrument, warn};

use crate::{Connection, ConnectionConfig, DatabaseDriver, DbError, ResultSet, ScalarValue};

/// Work that runs against a live connection inside [`ConnectionManager::scoped`].
#[async_trait]
pub trait ScopedWork: Send {
    type Output: Send;

    async fn run(self, conn: &mut dyn Connection) -> Self::Output;
}

/// Owns the session lifecycle for one credential set.
///
/// Not shared between concurrent callers: each caller builds its own manager
/// around a shared (stateless) driver.
pub struct ConnectionManager {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    connection: Option<Box<dyn Connection>>,
}

impl ConnectionManager {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self { driver, config, connection: None }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_open())
    }

    /// Open the session. Re-opening while already open is a no-op.
    ///
    /// # Errors
    /// [`DbError::UnknownDriver`] or [`DbError::Connection`].
    #[instrument(skip(self), fields(driver = %self.driver.name(), target = %self.config.target()))]
    pub async fn open(&mut self) -> Result<(), DbError> {
        if self.is_open() {
            return Ok(());
        }
        match self.driver.connect(&self.config).await {
            Ok(conn) => {
                self.connection = Some(conn);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to database: {}", e);
                Err(e)
            }
        }
    }

    /// Close the session. Idempotent; never fails.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close().await;
        }
    }

    fn live(&mut self) -> Result<&mut dyn Connection, DbError> {
        match self.connection.as_deref_mut() {
            Some(conn) if conn.is_open() => Ok(conn),
            _ => Err(DbError::NotConnected),
        }
    }

    /// Run a row-returning statement on the open session.
    pub async fn execute(&mut self, sql: &str, params: &[ScalarValue]) -> Result<ResultSet, DbError> {
        let conn = self.live()?;
        execute(conn, sql, params).await
    }

    /// Run a write statement on the open session; commit or roll back.
    pub async fn execute_write(&mut self, sql: &str, params: &[ScalarValue]) -> Result<u64, DbError> {
        let conn = self.live()?;
        execute_write(conn, sql, params).await
    }

    /// Open, hand the session to `work`, then close on every exit path.
    ///
    /// A panic inside `work` is re-raised after the session is closed.
    pub async fn scoped<W: ScopedWork>(&mut self, work: W) -> Result<W::Output, DbError> {
        self.open().await?;
        if !self.is_open() {
            self.close().await;
            return Err(DbError::NotConnected);
        }
        let conn = self.live()?;

        let outcome = AssertUnwindSafe(work.run(conn)).catch_unwind().await;
        self.close().await;

        match outcome {
            Ok(output) => Ok(output),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.is_open() {
            warn!(
                "connection manager for {} dropped with an open session; closing without a handshake",
                self.config.target()
            );
        }
    }
}

/// Run a row-returning statement and log the materialised row count.
///
/// # Errors
/// [`DbError::NotConnected`] on a closed session, [`DbError::Query`] when the
/// driver rejects the statement.
pub async fn execute(
    conn: &mut dyn Connection,
    sql: &str,
    params: &[ScalarValue],
) -> Result<ResultSet, DbError> {
    match conn.query(sql, params).await {
        Ok(result) => {
            info!("Query executed successfully, returned {} rows", result.len());
            Ok(result)
        }
        Err(e) => {
            warn!("Query execution failed: {}", e);
            Err(e)
        }
    }
}

/// Run a write statement in its own transaction and return affected rows.
pub async fn execute_write(
    conn: &mut dyn Connection,
    sql: &str,
    params: &[ScalarValue],
) -> Result<u64, DbError> {
    match conn.execute(sql, params).await {
        Ok(affected) => {
            info!("Non-query executed successfully, {} rows affected", affected);
            Ok(affected)
        }
        Err(e) => {
            warn!("Non-query execution failed: {}", e);
            Err(e)
        }
    }
}
