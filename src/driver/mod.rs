//! Database driver boundary.
//!
//! # Data Flow
//! ```text
//! Endpoint::connect()
//!     → Driver::open(EndpointConfig)     (physical connection / driver-side pool)
//!     → Connection::ping()               (workability check)
//!
//! Access facade call
//!     → Connection::execute / query / transaction
//!     → Ok(result) | Err(DriverError)    (classified by errors::classifier)
//! ```
//!
//! # Design Decisions
//! - Everything below this trait pair is opaque: SQL, TLS, wire framing
//! - `DriverError` keeps the driver's own sentinels (no rows, bad statement,
//!   vendor code, network failure) so classification stays a pure function
//! - Concrete drivers live behind cargo features (`postgres`)

#[cfg(feature = "postgres")]
pub mod postgres;

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::EndpointConfig;

/// Kind of transport failure reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Refused,
    Reset,
    Timeout,
    Closed,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkErrorKind::Refused => "connection refused",
            NetworkErrorKind::Reset => "connection reset",
            NetworkErrorKind::Timeout => "timed out",
            NetworkErrorKind::Closed => "connection closed",
        };
        f.write_str(s)
    }
}

/// Raw error as reported by a driver.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The statement matched no rows.
    #[error("no rows in result set")]
    NoRows,

    /// The driver rejected the statement before sending it.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// Server-side error carrying a vendor error code (SQLSTATE for Postgres).
    #[error("database error {code}: {message}")]
    Database { code: String, message: String },

    /// Transport-level failure.
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        DriverError::Database {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        DriverError::Network {
            kind,
            message: message.into(),
        }
    }

    /// Vendor error code, if the driver supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            DriverError::Database { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DriverError::Network { .. })
    }
}

impl From<io::Error> for DriverError {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::ConnectionRefused => Some(NetworkErrorKind::Refused),
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                Some(NetworkErrorKind::Reset)
            }
            io::ErrorKind::TimedOut => Some(NetworkErrorKind::Timeout),
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => Some(NetworkErrorKind::Closed),
            _ => None,
        };
        match kind {
            Some(kind) => DriverError::network(kind, e.to_string()),
            None => DriverError::Other(e.to_string()),
        }
    }
}

/// Bind parameter / result cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row: column names paired with values, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }
}

/// A live handle to one database target.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Round-trip check used to decide workability.
    async fn ping(&self) -> Result<(), DriverError>;

    /// Run a statement, returning the affected row count.
    async fn execute(&self, statement: &str, args: &[SqlValue]) -> Result<u64, DriverError>;

    /// Run a statement, returning all rows.
    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError>;

    /// Run the statements in one transaction; the first failure rolls back.
    async fn transaction(&self, statements: &[String]) -> Result<(), DriverError>;

    /// Release the handle. Further calls must fail, not panic.
    async fn close(&self);
}

/// Factory for connections to a configured endpoint.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver name used in logs.
    fn name(&self) -> &str;

    async fn open(&self, config: &EndpointConfig) -> Result<Arc<dyn Connection>, DriverError>;
}
