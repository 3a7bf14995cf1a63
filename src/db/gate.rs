//! In-flight statement gate.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::{Connection, DbError, Row};

/// Wraps a session connection so at most `max_in_flight` statements run at once.
///
/// Unit tasks run concurrently but queue here, so the monitored database sees
/// no more than `max_in_flight` statements from one scrape regardless of how
/// many units are enabled.
pub struct GatedConnection {
    inner: Arc<dyn Connection>,
    permits: Semaphore,
}

impl GatedConnection {
    pub fn new(inner: Arc<dyn Connection>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(max_in_flight.max(1)),
        }
    }
}

#[async_trait::async_trait]
impl Connection for GatedConnection {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        let _permit = self.permits.acquire().await.map_err(|_| DbError::Closed)?;
        self.inner.query(sql).await
    }

    async fn close(&self) {
        self.permits.close();
        self.inner.close().await;
    }
}
