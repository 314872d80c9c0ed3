//! Domain error taxonomy.
//!
//! # Data Flow
//! ```text
//! DriverError (raw, driver-specific)
//!     → classifier.rs (first-match decision table)
//!     → DomainError { kind, message, cause }
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Kinds are coarse and stable; the underlying driver error is kept as `source()`
//! - Each kind maps to a fixed numeric code for API consumers
//! - Nothing in this module retries or recovers

pub mod classifier;

use std::fmt;

use thiserror::Error;

use crate::driver::DriverError;

pub use classifier::{classify, classify_and_report, kind_of, UnavailableSink};

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad startup input; fatal to initialization.
    InvalidConfiguration,
    /// No workable endpoint, or a network-class failure.
    DatabaseUnavailable,
    DataNotFound,
    ResourceNotFound,
    /// Malformed statement.
    ProcessFailed,
    DuplicatedData,
    PrimaryKeyDuplicated,
    /// Generic / unclassified.
    DatabaseError,
}

impl ErrorKind {
    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::ResourceNotFound => 1020002,
            ErrorKind::InvalidConfiguration => 1020003,
            ErrorKind::DatabaseUnavailable => 1020006,
            ErrorKind::DatabaseError => 1020007,
            ErrorKind::ProcessFailed => 1020008,
            ErrorKind::PrimaryKeyDuplicated => 1020009,
            ErrorKind::DataNotFound => 1020010,
            ErrorKind::DuplicatedData => 1020017,
        }
    }

    /// Short label used for metric labels and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidConfiguration => "invalid_configuration",
            ErrorKind::DatabaseUnavailable => "database_unavailable",
            ErrorKind::DataNotFound => "data_not_found",
            ErrorKind::ResourceNotFound => "resource_not_found",
            ErrorKind::ProcessFailed => "process_failed",
            ErrorKind::DuplicatedData => "duplicated_data",
            ErrorKind::PrimaryKeyDuplicated => "primary_key_duplicated",
            ErrorKind::DatabaseError => "database_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidConfiguration => "Invalid Configuration",
            ErrorKind::DatabaseUnavailable => "Database Unavailable",
            ErrorKind::DataNotFound => "Data Not Found",
            ErrorKind::ResourceNotFound => "Resource Not Found",
            ErrorKind::ProcessFailed => "Processing Failed",
            ErrorKind::DuplicatedData => "Duplicated Data",
            ErrorKind::PrimaryKeyDuplicated => "Primary Key Duplicated",
            ErrorKind::DatabaseError => "Database Error",
        };
        f.write_str(s)
    }
}

/// A classified failure: kind, message and the preserved driver error.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<DriverError>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap a driver error; the message is the driver's own text.
    pub fn with_cause(kind: ErrorKind, cause: DriverError) -> Self {
        Self {
            kind,
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfiguration, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseUnavailable, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&DriverError> {
        self.cause.as_ref()
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ErrorKind::DatabaseUnavailable
    }
}

/// Result type for pool operations.
pub type DbResult<T> = Result<T, DomainError>;
