//! Native SAP HANA backend on `hdbconnect_async`.
//!
//! A session owns exactly one physical connection. Statements on it are
//! serialized by the mutex even when the gate admits more than one.

use std::sync::Arc;
use std::time::Duration;

use hdbconnect_async::{HdbValue, ResultSet};
use tokio::sync::Mutex;

use super::{Connection, Connector, DbError, Row, Target, Value, dsn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens HANA connections from an `hdbsql://` or `hdbsqls://` template.
#[derive(Debug, Clone)]
pub struct HanaConnector {
    dsn_template: String,
    connect_timeout: Duration,
}

impl HanaConnector {
    pub fn new(dsn_template: impl Into<String>) -> Self {
        Self {
            dsn_template: dsn_template.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the connection string for `target`.
    pub fn dsn_for(&self, target: &Target) -> Result<String, DbError> {
        dsn::render(&self.dsn_template, target)
    }
}

#[async_trait::async_trait]
impl Connector for HanaConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Connection>, DbError> {
        let dsn = self.dsn_for(target)?;
        let conn = tokio::time::timeout(
            self.connect_timeout,
            hdbconnect_async::Connection::new(dsn.as_str()),
        )
        .await
        .map_err(|_| DbError::Timeout(self.connect_timeout))??;

        tracing::debug!(target = %target.name, "HANA connection opened");
        Ok(Arc::new(HanaConnection {
            conn: Mutex::new(Some(conn)),
        }))
    }
}

/// A session connection to one HANA instance.
pub struct HanaConnection {
    conn: Mutex<Option<hdbconnect_async::Connection>>,
}

impl std::fmt::Debug for HanaConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HanaConnection").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Connection for HanaConnection {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DbError::Closed)?;
        let result_set = conn.query(sql).await?;
        decode_rows(result_set).await
    }

    async fn close(&self) {
        // Dropping the connection logs the session off.
        self.conn.lock().await.take();
    }
}

async fn decode_rows(result_set: ResultSet) -> Result<Vec<Row>, DbError> {
    let columns: Arc<[String]> = result_set
        .metadata()
        .iter()
        .map(|field| field.displayname().to_owned())
        .collect::<Vec<_>>()
        .into();

    let rows = result_set.into_rows().await?;
    Ok(rows
        .map(|row| Row::new(Arc::clone(&columns), row.map(decode_value).collect()))
        .collect())
}

/// Integer and floating types map directly. Everything else, `DECIMAL`
/// included, keeps its text form, which numeric columns parse on read.
fn decode_value(value: HdbValue<'static>) -> Value {
    match value {
        HdbValue::NULL => Value::Null,
        HdbValue::TINYINT(v) => Value::Int(i64::from(v)),
        HdbValue::SMALLINT(v) => Value::Int(i64::from(v)),
        HdbValue::INT(v) => Value::Int(i64::from(v)),
        HdbValue::BIGINT(v) => Value::Int(v),
        HdbValue::REAL(v) => Value::Float(f64::from(v)),
        HdbValue::DOUBLE(v) => Value::Float(v),
        HdbValue::BOOLEAN(v) => Value::Bool(v),
        HdbValue::STRING(v) => Value::Text(v),
        other => Value::Text(other.to_string()),
    }
}
