//! Endpoint pool subsystem.
//!
//! # Data Flow
//! ```text
//! Caller → access.rs (execute / query / transaction / run)
//!     → set.rs Pool::select()
//!         - Single: designated endpoint if workable, else DatabaseUnavailable
//!         - RoundRobin: round_robin.rs over the workable-list snapshot
//!     → Endpoint::acquire() (in-flight guard)
//!     → driver call
//!     → errors::classifier (network errors flip endpoint health)
//! ```
//!
//! # Design Decisions
//! - The workable list is rebuilt from scratch on every health transition
//! - Selection takes a read lock only; the counter is a lock-free atomic
//! - Health flips and rebuilds are not linearizable: a request can reach an
//!   endpoint that failed an instant earlier, and it will simply fail and
//!   re-report the failure
//! - No global pool: callers own `Pool` handles

pub mod access;
pub mod round_robin;
pub mod set;

pub use round_robin::RoundRobin;
pub use set::{Mode, Pool, PoolStatus};
