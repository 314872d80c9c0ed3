//! Access facade: run statements through the selected endpoint.
//!
//! Every call selects an endpoint, reserves it for the duration of the call,
//! runs the unit of work against its connection and classifies any driver
//! error. Nothing here retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::driver::{Connection, DriverError, Row, SqlValue};
use crate::errors::DbResult;
use crate::observability::metrics;
use crate::pool::set::Pool;

impl Pool {
    /// Run one unit of work against the connection of the selected endpoint.
    ///
    /// `label` names the work in logs (usually the statement text).
    pub async fn run<T, F, Fut>(&self, label: &str, work: F) -> DbResult<T>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        let endpoint = self.select()?;
        let guard = endpoint.acquire()?;

        let start = Instant::now();
        let result = work(guard.connection()).await;
        let elapsed = start.elapsed();

        metrics::record_operation(guard.name(), elapsed);
        tracing::debug!(
            endpoint = %guard.name(),
            statement = label,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "SQL"
        );

        result.map_err(|e| guard.classify(e))
    }

    /// Execute a statement; returns the affected row count.
    pub async fn execute(&self, statement: &str, args: &[SqlValue]) -> DbResult<u64> {
        self.run(statement, |conn| async move { conn.execute(statement, args).await })
            .await
    }

    /// Run a query and return every row.
    pub async fn query(&self, statement: &str, args: &[SqlValue]) -> DbResult<Vec<Row>> {
        self.run(statement, |conn| async move { conn.query(statement, args).await })
            .await
    }

    /// Run a query and return its first row; no rows is `DataNotFound`.
    pub async fn query_one(&self, statement: &str, args: &[SqlValue]) -> DbResult<Row> {
        self.run(statement, |conn| async move {
            conn.query(statement, args)
                .await?
                .into_iter()
                .next()
                .ok_or(DriverError::NoRows)
        })
        .await
    }

    /// Run a `SELECT count(*)`-style query and return the first column of its first row.
    pub async fn count(&self, statement: &str, args: &[SqlValue]) -> DbResult<i64> {
        self.run(statement, |conn| async move {
            let rows = conn.query(statement, args).await?;
            let first = rows
                .first()
                .and_then(|row| row.columns.first())
                .map(|(_, value)| value.clone());
            match first {
                Some(SqlValue::Int(n)) => Ok(n),
                Some(other) => Err(DriverError::Other(format!(
                    "count returned a non-integer value: {:?}",
                    other
                ))),
                None => Err(DriverError::NoRows),
            }
        })
        .await
    }

    /// Run the statements in one transaction on a single endpoint.
    pub async fn transaction(&self, statements: &[String]) -> DbResult<()> {
        let label = format!("TRANSACTION ({} statements)", statements.len());
        self.run(&label, |conn| async move { conn.transaction(statements).await })
            .await
    }

    /// Ping the endpoint that would serve the next request.
    pub async fn ping(&self) -> DbResult<()> {
        self.run("PING", |conn| async move { conn.ping().await }).await
    }
}
