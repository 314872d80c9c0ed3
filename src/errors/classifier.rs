//! Driver error classification.
//!
//! # Decision Order (first match wins)
//! ```text
//! NoRows sentinel           → DataNotFound
//! InvalidStatement sentinel → ProcessFailed
//! vendor code in table      → table entry
//! vendor code not in table  → DatabaseError (code logged)
//! network failure           → DatabaseUnavailable + endpoint marked unworkable
//! anything else             → DatabaseError
//! ```
//!
//! # Design Decisions
//! - Unknown vendor codes degrade to DatabaseError, never panic
//! - The only side effect is reporting network failures to an `UnavailableSink`

use crate::driver::DriverError;
use crate::errors::{DomainError, ErrorKind};
use crate::observability::metrics;

/// Receives network-class failures observed while classifying.
pub trait UnavailableSink {
    fn report_unavailable(&self, cause: &DriverError);
}

/// Postgres SQLSTATE → kind.
fn kind_for_code(code: &str) -> Option<ErrorKind> {
    match code {
        // duplicate_table
        "42P07" => Some(ErrorKind::DuplicatedData),
        // unique_violation
        "23505" => Some(ErrorKind::PrimaryKeyDuplicated),
        // undefined_table, undefined_column
        "42P01" | "42703" => Some(ErrorKind::ResourceNotFound),
        // syntax_error
        "42601" => Some(ErrorKind::ProcessFailed),
        _ => None,
    }
}

/// Pure kind lookup.
pub fn kind_of(err: &DriverError) -> ErrorKind {
    match err {
        DriverError::NoRows => ErrorKind::DataNotFound,
        DriverError::InvalidStatement(_) => ErrorKind::ProcessFailed,
        DriverError::Database { code, .. } => kind_for_code(code).unwrap_or_else(|| {
            tracing::debug!(code = %code, "Unhandled database error code");
            ErrorKind::DatabaseError
        }),
        DriverError::Network { .. } => ErrorKind::DatabaseUnavailable,
        DriverError::Other(_) => ErrorKind::DatabaseError,
    }
}

/// Classify without reporting to any sink.
pub fn classify(err: DriverError) -> DomainError {
    let kind = kind_of(&err);
    metrics::record_error(kind);
    DomainError::with_cause(kind, err)
}

/// Classify, reporting network failures to `sink` before returning.
pub fn classify_and_report(err: DriverError, sink: &dyn UnavailableSink) -> DomainError {
    if err.is_network() {
        sink.report_unavailable(&err);
    }
    classify(err)
}
