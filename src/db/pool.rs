//! sqlx backend using the `Any` driver.
//!
//! Every session receives its own single-purpose pool, so closing the pool at
//! session end is the same as closing the connection.

use std::sync::{Arc, Once};
use std::time::Duration;

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row as _};

use super::{Connection, Connector, DbError, Row, Target, Value, dsn};

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum connection lifetime.
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(60);

static INSTALL_DRIVERS: Once = Once::new();

/// Opens sqlx `Any` connections from a DSN template.
///
/// Serves the `postgres`, `mysql` and `sqlite` schemes. The template is
/// rendered per target by [`dsn::render`].
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    dsn_template: String,
    max_connections: u32,
    connect_timeout: Duration,
    max_lifetime: Duration,
}

impl SqlxConnector {
    pub fn new(dsn_template: impl Into<String>) -> Self {
        Self {
            dsn_template: dsn_template.into(),
            max_connections: 1,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_lifetime: DEFAULT_MAX_LIFETIME,
        }
    }

    /// Set the number of physical connections a session may open (minimum 1).
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Build the connection string for `target`.
    pub fn dsn_for(&self, target: &Target) -> Result<String, DbError> {
        dsn::render(&self.dsn_template, target)
    }
}

#[async_trait::async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Connection>, DbError> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let dsn = self.dsn_for(target)?;
        let pool = AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(0)
            .acquire_timeout(self.connect_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&dsn)
            .await?;

        tracing::debug!(target = %target.name, "Database connection opened");
        Ok(Arc::new(SqlxConnection { pool }))
    }
}

/// A session connection backed by a dedicated sqlx pool.
pub struct SqlxConnection {
    pool: AnyPool,
}

impl std::fmt::Debug for SqlxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxConnection")
            .field("closed", &self.pool.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Connection for SqlxConnection {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        if self.pool.is_closed() {
            return Err(DbError::Closed);
        }

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_owned())
            .collect::<Vec<_>>()
            .into();

        Ok(rows
            .iter()
            .map(|row| {
                let values = (0..columns.len()).map(|idx| decode_value(row, idx)).collect();
                Row::new(Arc::clone(&columns), values)
            })
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Decode one column, trying the types the `Any` driver can produce.
fn decode_value(row: &AnyRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(i64::from).into();
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(i64::from).into();
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(f64::from).into();
    }
    Value::Null
}
