//! RAII reservation of an endpoint for one operation.

use std::ops::Deref;
use std::sync::Arc;

use crate::driver::{Connection, DriverError};
use crate::endpoint::lifecycle::Endpoint;
use crate::errors::DomainError;

/// Holds an endpoint's connection handle and its in-flight slot.
///
/// Dropping the guard releases the slot; `Endpoint::close()` waits for all
/// guards before releasing the handle.
pub struct EndpointGuard {
    endpoint: Arc<Endpoint>,
    conn: Arc<dyn Connection>,
}

impl EndpointGuard {
    pub(crate) fn new(endpoint: Arc<Endpoint>, conn: Arc<dyn Connection>) -> Self {
        Self { endpoint, conn }
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Classify an error raised through this guard's connection.
    pub fn classify(&self, err: DriverError) -> DomainError {
        self.endpoint.classify(err)
    }
}

impl Deref for EndpointGuard {
    type Target = Endpoint;
    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        self.endpoint.release();
    }
}
