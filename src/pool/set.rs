//! Endpoint set management.
//!
//! # Responsibilities
//! - Build endpoints from configuration and connect them independently
//! - Maintain the workable subset, rebuilt from scratch on every health change
//! - Select an endpoint per request (single target or round-robin)
//! - Close and reconnect every registered endpoint

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::Serialize;
use tokio::task::JoinSet;

use crate::config::validation::validate_config;
use crate::config::{AccessTarget, ConnectConfig, DatabaseConfig, EndpointConfig};
use crate::driver::Driver;
use crate::endpoint::{Endpoint, EndpointStatus, HealthListener};
use crate::errors::{DbResult, DomainError};
use crate::observability::metrics;
use crate::pool::round_robin::RoundRobin;

/// Selection mode, fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Single,
    RoundRobin,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => f.write_str("single"),
            Mode::RoundRobin => f.write_str("round_robin"),
        }
    }
}

enum Selector {
    Single(Arc<Endpoint>),
    RoundRobin(RoundRobin),
}

/// Shared state behind a `Pool` handle.
pub(crate) struct EndpointSet {
    /// Every registered endpoint, fixed after construction.
    endpoints: Vec<Arc<Endpoint>>,
    /// Workable subset of `endpoints`, in registration order.
    valid: RwLock<Vec<Arc<Endpoint>>>,
    selector: Selector,
    closed: AtomicBool,
    rebuilds: AtomicU64,
}

impl EndpointSet {
    fn mode(&self) -> Mode {
        match self.selector {
            Selector::Single(_) => Mode::Single,
            Selector::RoundRobin(_) => Mode::RoundRobin,
        }
    }

    fn recompute_valid_list(&self) {
        let rebuilt: Vec<Arc<Endpoint>> = self
            .endpoints
            .iter()
            .filter(|ep| ep.is_workable())
            .cloned()
            .collect();

        let mut valid = self.valid.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            before = valid.len(),
            after = rebuilt.len(),
            total = self.endpoints.len(),
            "Rebuilt workable endpoint list"
        );
        *valid = rebuilt;
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }
}

impl HealthListener for EndpointSet {
    fn health_changed(&self) {
        self.recompute_valid_list();
    }
}

impl Drop for EndpointSet {
    // last handle gone without close(): probes hold their endpoints, not the set
    fn drop(&mut self) {
        for endpoint in &self.endpoints {
            endpoint.stop_recovery();
        }
    }
}

/// Handle to a set of database endpoints. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Pool {
    set: Arc<EndpointSet>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("mode", &self.mode())
            .field("endpoints", &self.set.endpoints)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Point-in-time view of a pool, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub mode: Mode,
    pub closed: bool,
    pub workable: usize,
    pub endpoints: Vec<EndpointStatus>,
}

impl Pool {
    /// Build and connect a pool from a loaded configuration.
    pub async fn from_config(config: &DatabaseConfig, driver: Arc<dyn Driver>) -> DbResult<Self> {
        Self::initialize(
            config.endpoints.clone(),
            config.access_target.clone(),
            config.connect.clone(),
            driver,
        )
        .await
    }

    /// Build endpoints for `access_target` and connect them.
    ///
    /// The inputs go through the same checks as a loaded config file; any
    /// problem is `InvalidConfiguration` and no endpoint is built.
    ///
    /// Round-robin registers every configured endpoint and connects them
    /// concurrently; one failing endpoint does not hold up the others. A named
    /// target registers only that endpoint. Endpoints that fail their initial
    /// connect start a recovery probe.
    pub async fn initialize(
        configs: Vec<EndpointConfig>,
        access_target: AccessTarget,
        connect: ConnectConfig,
        driver: Arc<dyn Driver>,
    ) -> DbResult<Self> {
        let config = DatabaseConfig {
            access_target,
            connect,
            endpoints: configs,
            ..Default::default()
        };
        if let Err(problems) = validate_config(&config) {
            let message = problems
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DomainError::invalid_configuration(message));
        }
        let DatabaseConfig {
            access_target,
            connect,
            endpoints: configs,
            ..
        } = config;

        let fail_fast = connect.fail_fast;
        let pool = match &access_target {
            AccessTarget::RoundRobin => {
                let endpoints = configs
                    .into_iter()
                    .map(|config| Endpoint::new(config, connect.clone(), Arc::clone(&driver)))
                    .collect();
                Self::assemble(endpoints, None)
            }
            AccessTarget::Named(name) => {
                let config = configs
                    .into_iter()
                    .find(|config| &config.name == name)
                    .ok_or_else(|| {
                        DomainError::invalid_configuration(format!(
                            "access target '{}' matches no configured endpoint",
                            name
                        ))
                    })?;
                let endpoint = Endpoint::new(config, connect, driver);
                Self::assemble(vec![Arc::clone(&endpoint)], Some(endpoint))
            }
        };

        pool.connect_all().await;

        let workable = pool.workable_endpoints().len();
        tracing::info!(
            mode = %pool.mode(),
            workable,
            total = pool.endpoints().len(),
            "Pool initialized"
        );

        if fail_fast && workable == 0 {
            pool.close().await;
            return Err(DomainError::unavailable(
                "no endpoint became workable during initialization",
            ));
        }
        Ok(pool)
    }

    fn assemble(endpoints: Vec<Arc<Endpoint>>, single: Option<Arc<Endpoint>>) -> Self {
        let set = Arc::new_cyclic(|weak: &Weak<EndpointSet>| {
            for endpoint in &endpoints {
                let listener: Weak<dyn HealthListener> = weak.clone();
                endpoint.attach(listener);
            }
            let selector = match single {
                Some(endpoint) => Selector::Single(endpoint),
                None => Selector::RoundRobin(RoundRobin::new()),
            };
            EndpointSet {
                endpoints,
                valid: RwLock::new(Vec::new()),
                selector,
                closed: AtomicBool::new(false),
                rebuilds: AtomicU64::new(0),
            }
        });
        Self { set }
    }

    async fn connect_all(&self) {
        let mut tasks = JoinSet::new();
        for endpoint in self.endpoints() {
            let endpoint = Arc::clone(endpoint);
            tasks.spawn(async move {
                let result = endpoint.connect().await;
                (endpoint, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((endpoint, Ok(()))) => {
                    tracing::info!(endpoint = %endpoint.name(), "Endpoint connected");
                }
                Ok((endpoint, Err(e))) => {
                    tracing::error!(endpoint = %endpoint.name(), error = %e, "Endpoint failed to connect");
                    endpoint.start_recovery();
                }
                Err(e) => tracing::error!(error = %e, "Connect task failed"),
            }
        }

        self.recompute_valid_list();
    }

    pub fn mode(&self) -> Mode {
        self.set.mode()
    }

    /// Every registered endpoint, in configuration order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.set.endpoints
    }

    pub fn endpoint(&self, name: &str) -> Option<&Arc<Endpoint>> {
        self.set.endpoints.iter().find(|ep| ep.name() == name)
    }

    /// Snapshot of the current workable list.
    pub fn workable_endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.set
            .valid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of workable-list rebuilds so far.
    pub fn rebuild_count(&self) -> u64 {
        self.set.rebuilds.load(Ordering::Relaxed)
    }

    /// Rotation counter of the round-robin selector (0 in single mode).
    pub fn position(&self) -> u64 {
        match &self.set.selector {
            Selector::Single(_) => 0,
            Selector::RoundRobin(rr) => rr.position(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.set.closed.load(Ordering::SeqCst)
    }

    /// Rebuild the workable list from the endpoints' current state.
    pub fn recompute_valid_list(&self) {
        self.set.recompute_valid_list();
    }

    /// Pick the endpoint for one request. Never blocks or waits for recovery.
    pub fn select(&self) -> DbResult<Arc<Endpoint>> {
        if self.is_closed() {
            return Err(DomainError::unavailable("pool is closed"));
        }

        let selected = match &self.set.selector {
            Selector::Single(endpoint) => {
                if !endpoint.is_workable() {
                    return Err(DomainError::unavailable(format!(
                        "endpoint '{}' is not workable",
                        endpoint.name()
                    )));
                }
                Arc::clone(endpoint)
            }
            Selector::RoundRobin(rr) => {
                let valid = self.set.valid.read().unwrap_or_else(PoisonError::into_inner);
                match rr.next(valid.as_slice()) {
                    Some(endpoint) => Arc::clone(endpoint),
                    None => {
                        tracing::debug!(
                            total = self.set.endpoints.len(),
                            "No workable endpoint"
                        );
                        return Err(DomainError::unavailable("no workable endpoint"));
                    }
                }
            }
        };

        metrics::record_selection(selected.name());
        Ok(selected)
    }

    /// Force every endpoint through a fresh connect, whatever its health.
    ///
    /// Fails with `DatabaseUnavailable` if no endpoint is workable afterwards.
    pub async fn reconnect(&self) -> DbResult<()> {
        if self.is_closed() {
            return Err(DomainError::unavailable("pool is closed"));
        }

        let mut tasks = JoinSet::new();
        for endpoint in self.endpoints() {
            let endpoint = Arc::clone(endpoint);
            tasks.spawn(async move {
                let result = endpoint.reconnect().await;
                (endpoint, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((endpoint, Err(e))) => {
                    tracing::warn!(endpoint = %endpoint.name(), error = %e, "Reconnect failed");
                }
                Ok((_, Ok(()))) => {}
                Err(e) => tracing::error!(error = %e, "Reconnect task failed"),
            }
        }

        self.recompute_valid_list();
        if self.workable_endpoints().is_empty() {
            Err(DomainError::unavailable("no endpoint workable after reconnect"))
        } else {
            Ok(())
        }
    }

    /// Close every registered endpoint, workable or not. Idempotent.
    pub async fn close(&self) {
        if self.set.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(mode = %self.mode(), "Closing pool");

        let mut tasks = JoinSet::new();
        for endpoint in self.endpoints() {
            let endpoint = Arc::clone(endpoint);
            tasks.spawn(async move { endpoint.close().await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Close task failed");
            }
        }

        self.recompute_valid_list();
        tracing::info!("Pool closed");
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            mode: self.mode(),
            closed: self.is_closed(),
            workable: self.workable_endpoints().len(),
            endpoints: self.endpoints().iter().map(|ep| ep.status()).collect(),
        }
    }
}
