//! Core scraper unit trait and types.

use std::sync::Arc;

use thiserror::Error;

use super::Measurement;
use crate::db::{Connection, DbError, Row};

/// Errors that end one unit's run. Sibling units are unaffected.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The unit's statement failed.
    #[error("query failed: {0}")]
    Db(#[from] DbError),

    /// A column the unit reads was not in the result set.
    #[error("column {0} missing from result")]
    MissingColumn(String),

    /// A column value could not be converted to what the unit expects.
    #[error("cannot scan column {column}: {reason}")]
    Scan { column: String, reason: String },

    /// The unit's task panicked.
    #[error("unit task panicked")]
    Panicked,
}

impl ScrapeError {
    pub fn scan(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Scan {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// What a unit gets to work with during one session.
///
/// Every unit of a session shares the same connection.
#[derive(Clone)]
pub struct ScrapeContext {
    connection: Arc<dyn Connection>,
    instance: Arc<str>,
    namespace: Arc<str>,
}

impl ScrapeContext {
    pub fn new(
        connection: Arc<dyn Connection>,
        instance: impl Into<Arc<str>>,
        namespace: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            connection,
            instance: instance.into(),
            namespace: namespace.into(),
        }
    }

    /// Value of the reserved instance label for this session.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Metric namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run a statement on the session connection.
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>, ScrapeError> {
        Ok(self.connection.query(sql).await?)
    }
}

impl std::fmt::Debug for ScrapeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeContext")
            .field("instance", &self.instance)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// An independent diagnostic query plus its row-to-measurement mapping.
///
/// # Error Handling Philosophy
///
/// - Values that vary with database version (unknown status strings and the
///   like) are skipped inside `scrape()`, which still returns `Ok`.
/// - Query and scan failures return `Err`. The orchestrator counts the failure
///   against this unit and discards whatever it produced in this session.
#[async_trait::async_trait]
pub trait ScraperUnit: Send + Sync + 'static {
    /// Unique name, used as the `collector` label and as the enable-flag key.
    fn name(&self) -> &str;

    /// What the unit collects.
    fn help(&self) -> &str;

    /// Whether the unit runs when the configuration does not mention it.
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Run the unit once against the session connection.
    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<Measurement>, ScrapeError>;
}
