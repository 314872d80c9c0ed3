//! Postgres driver backed by `sqlx`.
//!
//! Each endpoint handle is a small `sqlx` pool sized from the endpoint config.
//! Every new physical connection is switched to UTC. Result columns of types
//! without a `SqlValue` counterpart (numeric, timestamps, uuid) are rejected
//! rather than read as NULL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgColumn, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};

use crate::config::EndpointConfig;
use crate::driver::{Connection, Driver, DriverError, NetworkErrorKind, Row, SqlValue};

/// Opens `sqlx` Postgres pools.
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    acquire_timeout: Duration,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn open(&self, config: &EndpointConfig) -> Result<Arc<dyn Connection>, DriverError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .password(&config.password);
        if !config.user.is_empty() {
            options = options.username(&config.user);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            // sqlx has no idle cap; keep this many warm instead
            .min_connections(config.max_idle_connections.min(config.max_connections))
            .acquire_timeout(self.acquire_timeout)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET TIME ZONE 'UTC'").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(map_error)?;

        Ok(Arc::new(PostgresConnection { pool }))
    }
}

struct PostgresConnection {
    pool: PgPool,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn ping(&self) -> Result<(), DriverError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn execute(&self, statement: &str, args: &[SqlValue]) -> Result<u64, DriverError> {
        bind_all(sqlx::query(statement), args)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(map_error)
    }

    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        let rows = bind_all(sqlx::query(statement), args)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn transaction(&self, statements: &[String]) -> Result<(), DriverError> {
        let mut tx = self.pool.begin().await.map_err(map_error)?;
        for statement in statements {
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                return Err(map_error(e));
            }
        }
        tx.commit().await.map_err(map_error)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Row, DriverError> {
    let columns = row
        .columns()
        .iter()
        .map(|col| Ok((col.name().to_string(), decode_cell(row, col)?)))
        .collect::<Result<Vec<_>, DriverError>>()?;
    Ok(Row { columns })
}

/// Column types with a `SqlValue` counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Bool,
    Int8,
    Int4,
    Int2,
    Float8,
    Float4,
    Text,
}

fn cell_kind(type_name: &str) -> Option<CellKind> {
    match type_name {
        "BOOL" => Some(CellKind::Bool),
        "INT8" => Some(CellKind::Int8),
        "INT4" => Some(CellKind::Int4),
        "INT2" => Some(CellKind::Int2),
        "FLOAT8" => Some(CellKind::Float8),
        "FLOAT4" => Some(CellKind::Float4),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Some(CellKind::Text),
        _ => None,
    }
}

fn unsupported_type(column: &str, type_name: &str) -> DriverError {
    DriverError::Other(format!(
        "column '{}' has type {} which has no SqlValue mapping; cast it in the query (e.g. ::text)",
        column, type_name
    ))
}

fn decode_cell(row: &PgRow, col: &PgColumn) -> Result<SqlValue, DriverError> {
    let index = col.ordinal();
    let type_name = col.type_info().name();
    let kind = cell_kind(type_name).ok_or_else(|| unsupported_type(col.name(), type_name))?;

    let value = match kind {
        CellKind::Bool => row.try_get::<Option<bool>, _>(index).map(SqlValue::from),
        CellKind::Int8 => row.try_get::<Option<i64>, _>(index).map(SqlValue::from),
        CellKind::Int4 => row.try_get::<Option<i32>, _>(index).map(SqlValue::from),
        CellKind::Int2 => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map_or(SqlValue::Null, |n| SqlValue::Int(n.into()))),
        CellKind::Float8 => row.try_get::<Option<f64>, _>(index).map(SqlValue::from),
        CellKind::Float4 => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map_or(SqlValue::Null, |n| SqlValue::Float(n.into()))),
        CellKind::Text => row.try_get::<Option<String>, _>(index).map(SqlValue::from),
    };
    value.map_err(map_error)
}

/// Translate `sqlx` errors into the driver taxonomy.
fn map_error(e: sqlx::Error) -> DriverError {
    match e {
        sqlx::Error::RowNotFound => DriverError::NoRows,
        sqlx::Error::Database(db) => {
            let message = db.message().to_string();
            match db.code() {
                Some(code) => DriverError::database(code.into_owned(), message),
                None => DriverError::Other(message),
            }
        }
        sqlx::Error::Io(io) => io.into(),
        // every connection busy: the endpoint is saturated, not down
        sqlx::Error::PoolTimedOut => {
            DriverError::Other("timed out acquiring a connection".to_string())
        }
        sqlx::Error::PoolClosed => DriverError::network(NetworkErrorKind::Closed, "pool is closed"),
        sqlx::Error::ColumnNotFound(column) => {
            DriverError::InvalidStatement(format!("no column named '{}'", column))
        }
        other => DriverError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(map_error(sqlx::Error::RowNotFound), DriverError::NoRows));
        assert!(matches!(map_error(sqlx::Error::PoolTimedOut), DriverError::Other(_)));
        assert!(map_error(sqlx::Error::PoolClosed).is_network());

        let refused = sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(map_error(refused).is_network());
    }

    #[test]
    fn test_cell_kinds() {
        assert_eq!(cell_kind("INT4"), Some(CellKind::Int4));
        assert_eq!(cell_kind("VARCHAR"), Some(CellKind::Text));
        assert_eq!(cell_kind("NUMERIC"), None);
        assert_eq!(cell_kind("TIMESTAMPTZ"), None);
        assert_eq!(cell_kind("UUID"), None);
    }

    #[test]
    fn test_unsupported_type_names_column() {
        let err = unsupported_type("price", "NUMERIC");
        assert!(matches!(&err, DriverError::Other(msg) if msg.contains("'price'") && msg.contains("NUMERIC")));
        assert!(!err.is_network());
    }
}
