//! Linear backoff for connection establishment.

use std::time::Duration;

/// Delay after failed attempt number `attempt` (1-based): `attempt * unit`.
pub fn linear_backoff(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(attempt)
}
