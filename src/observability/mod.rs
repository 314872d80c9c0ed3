//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoints, pool and classifier produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until a recorder is installed
//! - Endpoint name is the common label / field everywhere

pub mod logging;
pub mod metrics;
