//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint::connect():
//!     → Driver::open() fails
//!     → backoff.rs (attempt × unit)
//!     → retry until max_attempts
//! ```
//!
//! # Design Decisions
//! - Only connection establishment retries; in-flight statements never do
//! - Linear, not exponential: recovery probing already spaces out retries

pub mod backoff;
