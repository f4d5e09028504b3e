//! `MockDriver` — a test double for `DatabaseDriver`.
//!
//! Scripted in memory: queries are answered from a SQL → `ResultSet` table,
//! failures are injected at construction time, and every call is recorded so
//! tests can assert on connect/close counts and executed statements.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{Connection, ConnectionConfig, DatabaseDriver, DbError, ResultSet, ScalarValue};

/// Behaviour injected into `MockDriver` at construction time.
#[derive(Debug, Clone, Default)]
pub enum MockBehaviour {
    /// Answer scripted queries, fail unscripted ones.
    #[default]
    Scripted,
    /// Refuse every connection attempt.
    RefuseConnect(String),
    /// Connect, then fail every statement.
    FailQueries(String),
    /// Connect, but hand back a session that already reports itself closed.
    StaleSession,
}

/// Everything the driver has seen, shared with its connections.
#[derive(Debug, Default)]
pub struct MockLog {
    pub connects: usize,
    pub closes: usize,
    pub statements: Vec<(String, Vec<ScalarValue>)>,
    /// Configs seen by `connect`, in redacted connection-string form.
    pub targets: Vec<String>,
}

/// An in-memory driver with scripted answers.
#[derive(Clone, Default)]
pub struct MockDriver {
    behaviour: MockBehaviour,
    results: Arc<HashMap<String, ResultSet>>,
    affected: u64,
    log: Arc<Mutex<MockLog>>,
}

impl MockDriver {
    /// A driver with no scripted answers; useful for write-only tests.
    pub fn new() -> Self {
        Self::with_behaviour(MockBehaviour::Scripted, HashMap::new())
    }

    /// A driver that answers `sql` with `result`.
    pub fn returning(sql: impl Into<String>, result: ResultSet) -> Self {
        Self::scripted([(sql.into(), result)])
    }

    /// A driver with several scripted answers.
    pub fn scripted(results: impl IntoIterator<Item = (String, ResultSet)>) -> Self {
        Self::with_behaviour(MockBehaviour::Scripted, results.into_iter().collect())
    }

    fn with_behaviour(behaviour: MockBehaviour, results: HashMap<String, ResultSet>) -> Self {
        Self {
            behaviour,
            results: Arc::new(results),
            affected: 0,
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn refusing_connect(msg: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::RefuseConnect(msg.into()), HashMap::new())
    }

    pub fn failing_queries(msg: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::FailQueries(msg.into()), HashMap::new())
    }

    pub fn stale_sessions() -> Self {
        Self::with_behaviour(MockBehaviour::StaleSession, HashMap::new())
    }

    /// Row count reported by every successful `execute`.
    pub fn with_affected_rows(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.log.lock().unwrap().connects
    }

    pub fn close_count(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn statements(&self) -> Vec<(String, Vec<ScalarValue>)> {
        self.log.lock().unwrap().statements.clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.log.lock().unwrap().targets.clone()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>, DbError> {
        {
            let mut log = self.log.lock().unwrap();
            log.connects += 1;
            log.targets.push(config.connection_string().to_string());
        }

        if let MockBehaviour::RefuseConnect(msg) = &self.behaviour {
            return Err(DbError::Connection {
                target: config.target(),
                message: msg.clone(),
            });
        }

        Ok(Box::new(MockConnection {
            driver: self.clone(),
            open: true,
        }))
    }
}

struct MockConnection {
    driver: MockDriver,
    open: bool,
}

impl MockConnection {
    fn record(&self, sql: &str, params: &[ScalarValue]) -> Result<(), DbError> {
        if !self.open {
            return Err(DbError::NotConnected);
        }
        self.driver
            .log
            .lock()
            .unwrap()
            .statements
            .push((sql.to_owned(), params.to_vec()));
        if let MockBehaviour::FailQueries(msg) = &self.driver.behaviour {
            return Err(DbError::Query(msg.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, sql: &str, params: &[ScalarValue]) -> Result<ResultSet, DbError> {
        self.record(sql, params)?;
        self.driver
            .results
            .get(sql)
            .cloned()
            .ok_or_else(|| DbError::Query(format!("no such table for statement: {sql}")))
    }

    async fn execute(&mut self, sql: &str, params: &[ScalarValue]) -> Result<u64, DbError> {
        self.record(sql, params)
            .map_err(|e| match e {
                DbError::Query(msg) => DbError::WriteRolledBack(msg),
                other => other,
            })?;
        Ok(self.driver.affected)
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.driver.log.lock().unwrap().closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open && !matches!(self.driver.behaviour, MockBehaviour::StaleSession)
    }
}
