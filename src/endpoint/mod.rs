//! Database endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! Pool::initialize
//!     → lifecycle.rs Endpoint::connect (open with linear backoff, ping)
//!     → state.rs: Connecting → Workable | Unworkable
//!
//! Operation fails with a network error
//!     → errors::classifier reports to the endpoint
//!     → Endpoint::mark_unworkable → pool rebuilds its workable list
//!     → recovery.rs probe (one per endpoint) until connect succeeds
//!
//! Operation in progress
//!     → guard.rs holds an in-flight slot; close() drains slots first
//! ```
//!
//! # Design Decisions
//! - Workability means "last ping succeeded", not "has a handle"
//! - Health changes are pushed to the pool synchronously (`HealthListener`)
//! - The probe is owned by its endpoint and cancelled by `close()`

pub mod guard;
pub mod lifecycle;
pub mod recovery;
pub mod state;

pub use guard::EndpointGuard;
pub use lifecycle::{Endpoint, EndpointStatus, HealthListener};
pub use state::EndpointState;
