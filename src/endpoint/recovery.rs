//! Background recovery probe.
//!
//! # Responsibilities
//! - Every health-check interval, attempt a fresh `connect()`
//! - Stop for good on the first success (endpoint is workable again)
//! - Stop when the endpoint's shutdown signal fires
//!
//! # Design Decisions
//! - No retry ceiling: recovery is eventual-or-never
//! - One probe per endpoint, enforced by `Endpoint::start_recovery`

use std::sync::Arc;

use tokio::time;

use crate::endpoint::lifecycle::Endpoint;
use crate::lifecycle::shutdown::ShutdownSignal;

pub(crate) async fn run(endpoint: Arc<Endpoint>, mut shutdown: ShutdownSignal) {
    let interval = endpoint.config().health_check_interval();
    tracing::info!(
        endpoint = %endpoint.name(),
        interval_ms = interval.as_millis() as u64,
        "Recovery probe starting"
    );

    let mut rounds: u64 = 0;
    loop {
        tokio::select! {
            _ = time::sleep(interval) => {}
            _ = shutdown.recv() => {
                tracing::info!(endpoint = %endpoint.name(), "Recovery probe received shutdown signal, exiting loop");
                break;
            }
        }

        rounds += 1;
        tracing::debug!(endpoint = %endpoint.name(), round = rounds, "Checking whether endpoint is workable");

        let outcome = tokio::select! {
            outcome = endpoint.connect() => outcome,
            _ = shutdown.recv() => {
                tracing::info!(endpoint = %endpoint.name(), "Recovery probe cancelled mid-connect");
                break;
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!(endpoint = %endpoint.name(), rounds, "Endpoint recovered");
                break;
            }
            Err(e) => {
                tracing::debug!(endpoint = %endpoint.name(), round = rounds, error = %e, "Endpoint still unworkable");
            }
        }
    }

    endpoint.probe_finished();
}
