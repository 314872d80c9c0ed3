//! Client-side access layer for a replicated relational database.
//!
//! Keeps a set of named endpoints, routes each request to one of them (a single
//! designated endpoint or round-robin over the workable ones), detects endpoint
//! failure from driver errors and recovers failed endpoints in the background.
//!
//! ```text
//!  caller ──▶ Pool (access facade) ──▶ select() ──▶ Endpoint ──▶ Driver
//!                  ▲                                   │
//!                  └──── DomainError ◀── classifier ◀──┘
//!                                          │ network error
//!                                          ▼
//!                                mark_unworkable → recovery probe
//! ```

pub mod config;
pub mod driver;
pub mod endpoint;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use config::DatabaseConfig;
pub use driver::{Connection, Driver, DriverError, Row, SqlValue};
pub use endpoint::{Endpoint, EndpointState};
pub use errors::{DbResult, DomainError, ErrorKind};
pub use pool::{Mode, Pool};
