//! Scripted in-memory backend.
//!
//! Answers statements from a fixed table keyed by statement text. Compiled for
//! the test suites and with the `testing` feature.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::{Connection, Connector, DbError, Row, Target, Value};

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Fail(String),
}

/// Canned responses for one target.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    responses: HashMap<String, Response>,
    delay: Option<Duration>,
    queries: AtomicUsize,
    open: AtomicUsize,
    opened: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `rows`, each row given in `columns` order.
    pub fn with_rows(mut self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns
            .iter()
            .map(|c| (*c).to_string())
            .collect::<Vec<_>>()
            .into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        self.responses.insert(normalize(sql), Response::Rows(rows));
        self
    }

    /// Fail `sql` with `message`.
    pub fn with_failure(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.responses
            .insert(normalize(sql), Response::Fail(message.into()));
        self
    }

    /// Sleep this long before answering each statement.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Statements executed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Connections currently open (opened and not yet closed or dropped).
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Connections opened so far.
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

/// Connector over a set of [`MemoryDatabase`]s. Unknown targets are unreachable.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    databases: HashMap<String, Arc<MemoryDatabase>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, target: impl Into<String>, database: MemoryDatabase) -> Self {
        self.databases.insert(target.into(), Arc::new(database));
        self
    }

    pub fn database(&self, target: &str) -> Option<Arc<MemoryDatabase>> {
        self.databases.get(target).cloned()
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Connection>, DbError> {
        let database = self
            .databases
            .get(&target.name)
            .ok_or_else(|| DbError::Query(format!("target {} unreachable", target.name)))?;

        database.open.fetch_add(1, Ordering::SeqCst);
        database.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryConnection {
            database: Arc::clone(database),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemoryConnection {
    database: Arc<MemoryDatabase>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn release(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.database.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl Connection for MemoryConnection {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::Closed);
        }
        if let Some(delay) = self.database.delay {
            tokio::time::sleep(delay).await;
        }
        self.database.queries.fetch_add(1, Ordering::SeqCst);

        match self.database.responses.get(&normalize(sql)) {
            Some(Response::Rows(rows)) => Ok(rows.clone()),
            Some(Response::Fail(message)) => Err(DbError::Query(message.clone())),
            None => Err(DbError::Query(format!("no such table for statement: {sql}"))),
        }
    }

    async fn close(&self) {
        self.release();
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.release();
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
