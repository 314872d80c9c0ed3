//! A single database endpoint.
//!
//! # Responsibilities
//! - Own the live connection handle for one configured target
//! - Connect with bounded linear-backoff retry and a workability ping
//! - Flip health state and notify the owning pool
//! - Run at most one recovery probe at a time
//! - Track in-flight operations so `close()` can drain them

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::{ConnectConfig, EndpointConfig};
use crate::driver::{Connection, Driver, DriverError};
use crate::endpoint::guard::EndpointGuard;
use crate::endpoint::recovery;
use crate::endpoint::state::{EndpointState, StateCell};
use crate::errors::{classify_and_report, DbResult, DomainError, ErrorKind, UnavailableSink};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::backoff::linear_backoff;

/// Told about every health transition of an endpoint.
pub trait HealthListener: Send + Sync {
    fn health_changed(&self);
}

/// Point-in-time view of an endpoint, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub state: EndpointState,
    pub in_flight: usize,
    pub probing: bool,
    pub connect_attempts: u64,
}

/// One physical database target.
pub struct Endpoint {
    config: EndpointConfig,
    connect: ConnectConfig,
    driver: Arc<dyn Driver>,

    conn: RwLock<Option<Arc<dyn Connection>>>,
    state: StateCell,

    /// Set while a recovery probe is scheduled or running.
    probing: AtomicBool,
    probe_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: Shutdown,

    in_flight: AtomicUsize,
    drained: Notify,

    listener: OnceLock<Weak<dyn HealthListener>>,
    connect_attempts: AtomicU64,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.config.name)
            .field("driver", &self.driver.name())
            .field("state", &self.state.load())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

impl Endpoint {
    /// Create a disconnected endpoint in the `Connecting` state.
    pub fn new(config: EndpointConfig, connect: ConnectConfig, driver: Arc<dyn Driver>) -> Arc<Self> {
        Arc::new(Self {
            config,
            connect,
            driver,
            conn: RwLock::new(None),
            state: StateCell::new(EndpointState::Connecting),
            probing: AtomicBool::new(false),
            probe_task: Mutex::new(None),
            shutdown: Shutdown::new(),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            listener: OnceLock::new(),
            connect_attempts: AtomicU64::new(0),
        })
    }

    /// Register the owning pool. Only the first call takes effect.
    pub fn attach(&self, listener: Weak<dyn HealthListener>) {
        if self.listener.set(listener).is_err() {
            tracing::warn!(endpoint = %self.name(), "Endpoint already attached to a pool");
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn state(&self) -> EndpointState {
        self.state.load()
    }

    pub fn is_workable(&self) -> bool {
        self.state.load() == EndpointState::Workable
    }

    pub fn is_closed(&self) -> bool {
        self.state.load() == EndpointState::Closed
    }

    /// Whether a recovery probe is currently scheduled.
    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::SeqCst)
    }

    /// Total `Driver::open` calls made for this endpoint.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> EndpointStatus {
        EndpointStatus {
            name: self.config.name.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
            state: self.state(),
            in_flight: self.in_flight(),
            probing: self.is_probing(),
            connect_attempts: self.connect_attempts(),
        }
    }

    // --- Connection ---

    /// Open a fresh handle (with retry) and ping it.
    ///
    /// `Ok` means the endpoint is now workable. A handle whose ping fails is kept,
    /// but the endpoint stays unworkable.
    pub async fn connect(&self) -> DbResult<()> {
        let conn = self.open_with_retry().await?;

        let previous = self
            .conn
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&conn));
        // in-flight operations keep their own clone of the old handle
        drop(previous);

        if self.is_closed() {
            self.take_connection();
            conn.close().await;
            return Err(self.closed_error());
        }

        match conn.ping().await {
            Ok(()) => {
                self.mark_workable();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.name(), error = %e, "Connected but ping failed");
                self.set_unworkable();
                Err(DomainError::with_cause(ErrorKind::DatabaseUnavailable, e))
            }
        }
    }

    async fn open_with_retry(&self) -> DbResult<Arc<dyn Connection>> {
        let max_attempts = self.connect.max_attempts.max(1);
        let unit = self.connect.backoff_unit();
        let mut last_error: Option<DriverError> = None;

        for attempt in 1..=max_attempts {
            if self.is_closed() {
                return Err(self.closed_error());
            }
            self.connect_attempts.fetch_add(1, Ordering::Relaxed);

            match self.driver.open(&self.config).await {
                Ok(conn) => {
                    metrics::record_connect_attempt(self.name(), true);
                    tracing::debug!(endpoint = %self.name(), attempt, "Connection opened");
                    return Ok(conn);
                }
                Err(e) => {
                    metrics::record_connect_attempt(self.name(), false);
                    tracing::warn!(
                        endpoint = %self.name(),
                        dsn = %self.config.redacted_dsn(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Connect attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(linear_backoff(attempt, unit)).await;
                    }
                }
            }
        }

        self.set_unworkable();
        Err(match last_error {
            Some(e) => DomainError::with_cause(ErrorKind::DatabaseUnavailable, e),
            None => DomainError::unavailable(format!(
                "endpoint '{}' could not be connected",
                self.name()
            )),
        })
    }

    /// Drop the current handle and connect again, regardless of current health.
    ///
    /// On failure a recovery probe takes over.
    pub async fn reconnect(self: &Arc<Self>) -> DbResult<()> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        tracing::info!(endpoint = %self.name(), "Reconnecting");
        self.set_unworkable();

        match self.connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.start_recovery();
                Err(e)
            }
        }
    }

    fn take_connection(&self) -> Option<Arc<dyn Connection>> {
        self.conn.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn closed_error(&self) -> DomainError {
        DomainError::unavailable(format!("endpoint '{}' is closed", self.name()))
    }

    // --- Health ---

    /// Flip to workable and tell the pool.
    pub fn mark_workable(&self) {
        if self.state.transition(EndpointState::Workable) {
            tracing::info!(endpoint = %self.name(), "Endpoint is workable");
            metrics::record_endpoint_health(self.name(), true);
            self.notify_listener();
        }
    }

    /// Flip to unworkable, tell the pool, and make sure a recovery probe runs.
    pub fn mark_unworkable(self: &Arc<Self>) {
        self.set_unworkable();
        self.start_recovery();
    }

    fn set_unworkable(&self) {
        if self.state.transition(EndpointState::Unworkable) {
            tracing::warn!(endpoint = %self.name(), "Endpoint is unworkable");
            metrics::record_endpoint_health(self.name(), false);
            self.notify_listener();
        }
    }

    fn notify_listener(&self) {
        if let Some(listener) = self.listener.get().and_then(Weak::upgrade) {
            listener.health_changed();
        }
    }

    /// Spawn the recovery probe unless one is already scheduled.
    ///
    /// Returns whether a new probe was started. Outside a Tokio runtime no probe
    /// can be spawned and this returns false.
    pub fn start_recovery(self: &Arc<Self>) -> bool {
        if self.is_closed() || self.shutdown.is_triggered() {
            return false;
        }
        if self
            .probing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(endpoint = %self.name(), "Recovery probe already scheduled");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!(endpoint = %self.name(), "No async runtime, cannot start recovery probe");
                self.probing.store(false, Ordering::SeqCst);
                return false;
            }
        };

        let task = runtime.spawn(recovery::run(Arc::clone(self), self.shutdown.subscribe()));
        *self.probe_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        true
    }

    /// Cancel any running probe and refuse new ones, without closing the handle.
    pub(crate) fn stop_recovery(&self) {
        if !self.shutdown.is_triggered() {
            tracing::debug!(endpoint = %self.name(), "Stopping recovery");
        }
        self.shutdown.trigger();
    }

    /// Called by the probe task as its last step.
    pub(crate) fn probe_finished(self: &Arc<Self>) {
        self.probing.store(false, Ordering::SeqCst);
        // a failure reported while the guard was still held was suppressed
        if self.state() == EndpointState::Unworkable {
            self.start_recovery();
        }
    }

    // --- In-flight tracking ---

    /// Reserve the endpoint for one operation.
    ///
    /// Fails with `DatabaseUnavailable` once the endpoint is closed or has no handle.
    pub fn acquire(self: &Arc<Self>) -> DbResult<EndpointGuard> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let conn = if self.is_closed() {
            None
        } else {
            self.conn
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        };

        match conn {
            Some(conn) => Ok(EndpointGuard::new(Arc::clone(self), conn)),
            None => {
                let err = if self.is_closed() {
                    self.closed_error()
                } else {
                    DomainError::unavailable(format!("endpoint '{}' has no connection", self.name()))
                };
                self.release();
                Err(err)
            }
        }
    }

    pub(crate) fn release(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Classify a driver error raised by an operation on this endpoint.
    pub fn classify(self: &Arc<Self>, err: DriverError) -> DomainError {
        classify_and_report(err, self)
    }

    // --- Shutdown ---

    /// Close the endpoint: reject new operations, stop the probe, drain in-flight
    /// operations (bounded by the drain timeout), then release the handle.
    pub async fn close(&self) {
        let previous = self.state.close();
        if previous == EndpointState::Closed {
            return;
        }
        metrics::record_endpoint_health(self.name(), false);
        self.notify_listener();
        self.shutdown.trigger();

        self.drain(self.connect.drain_timeout()).await;

        if let Some(conn) = self.take_connection() {
            conn.close().await;
        }

        let task = self
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut task) = task {
            if tokio::time::timeout(Duration::from_secs(1), &mut task)
                .await
                .is_err()
            {
                task.abort();
            }
        }

        tracing::info!(endpoint = %self.name(), "Endpoint closed");
    }

    async fn drain(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.drained.notified();
            let outstanding = self.in_flight();
            if outstanding == 0 {
                return;
            }
            tracing::debug!(endpoint = %self.name(), outstanding, "Waiting for in-flight operations");
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                tracing::warn!(
                    endpoint = %self.name(),
                    outstanding = self.in_flight(),
                    "Drain timeout elapsed, closing with operations in flight"
                );
                return;
            }
        }
    }
}

impl UnavailableSink for Arc<Endpoint> {
    fn report_unavailable(&self, cause: &DriverError) {
        tracing::warn!(endpoint = %self.name(), error = %cause, "Network failure, marking endpoint unworkable");
        self.mark_unworkable();
    }
}
