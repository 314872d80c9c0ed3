//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Endpoint::close() → trigger → recovery probe exits at its next await point
//!
//! Signals (signals.rs):
//!     SIGINT → CLI `watch` closes the pool gracefully
//! ```
//!
//! # Design Decisions
//! - Each endpoint owns its shutdown coordinator; closing the pool closes every endpoint
//! - Late subscribers still observe a shutdown that already happened

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
