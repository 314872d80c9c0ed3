//! Shared utilities for integration testing: a scriptable in-memory driver.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dbpool::config::{ConnectConfig, EndpointConfig};
use dbpool::driver::{Connection, Driver, DriverError, NetworkErrorKind, Row, SqlValue};

#[derive(Default)]
struct Script {
    down: HashSet<String>,
    ping_fails: HashSet<String>,
    errors: HashMap<String, VecDeque<DriverError>>,
    delays: HashMap<String, Duration>,
    opens: HashMap<String, usize>,
    hits: HashMap<String, usize>,
    closes: HashMap<String, usize>,
}

/// In-memory driver whose endpoints can be taken down, slowed or made to fail.
#[derive(Default)]
pub struct MockDriver {
    script: Arc<Mutex<Script>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A down endpoint refuses connections and fails every operation.
    pub fn set_down(&self, name: &str, down: bool) {
        let mut script = self.script.lock().unwrap();
        if down {
            script.down.insert(name.to_string());
        } else {
            script.down.remove(name);
        }
    }

    pub fn set_ping_fails(&self, name: &str, fails: bool) {
        let mut script = self.script.lock().unwrap();
        if fails {
            script.ping_fails.insert(name.to_string());
        } else {
            script.ping_fails.remove(name);
        }
    }

    /// Queue an error for the next operation on `name`.
    pub fn fail_next(&self, name: &str, err: DriverError) {
        self.script
            .lock()
            .unwrap()
            .errors
            .entry(name.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn set_delay(&self, name: &str, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(name.to_string(), delay);
    }

    pub fn opens(&self, name: &str) -> usize {
        self.script.lock().unwrap().opens.get(name).copied().unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.script.lock().unwrap().opens.values().sum()
    }

    pub fn hits(&self, name: &str) -> usize {
        self.script.lock().unwrap().hits.get(name).copied().unwrap_or(0)
    }

    pub fn closes(&self, name: &str) -> usize {
        self.script.lock().unwrap().closes.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, config: &EndpointConfig) -> Result<Arc<dyn Connection>, DriverError> {
        let mut script = self.script.lock().unwrap();
        *script.opens.entry(config.name.clone()).or_default() += 1;
        if script.down.contains(&config.name) {
            return Err(DriverError::network(
                NetworkErrorKind::Refused,
                format!("{} refused the connection", config.host),
            ));
        }
        Ok(Arc::new(MockConnection {
            name: config.name.clone(),
            script: Arc::clone(&self.script),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockConnection {
    name: String,
    script: Arc<Mutex<Script>>,
    closed: AtomicBool,
}

impl MockConnection {
    /// Common preamble: closed / down / scripted error checks, then hit count.
    async fn operate(&self) -> Result<(), DriverError> {
        let delay = self.script.lock().unwrap().delays.get(&self.name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::network(NetworkErrorKind::Closed, "connection closed"));
        }
        let mut script = self.script.lock().unwrap();
        if script.down.contains(&self.name) {
            return Err(DriverError::network(NetworkErrorKind::Reset, "connection reset by peer"));
        }
        if let Some(err) = script.errors.get_mut(&self.name).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        *script.hits.entry(self.name.clone()).or_default() += 1;
        Ok(())
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn ping(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::network(NetworkErrorKind::Closed, "connection closed"));
        }
        let script = self.script.lock().unwrap();
        if script.down.contains(&self.name) || script.ping_fails.contains(&self.name) {
            return Err(DriverError::network(NetworkErrorKind::Timeout, "ping timed out"));
        }
        Ok(())
    }

    async fn execute(&self, _statement: &str, _args: &[SqlValue]) -> Result<u64, DriverError> {
        self.operate().await?;
        Ok(1)
    }

    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        self.operate().await?;
        if statement.contains("WHERE false") {
            return Ok(Vec::new());
        }
        let mut columns = vec![("endpoint".to_string(), SqlValue::Text(self.name.clone()))];
        columns.extend(
            args.iter()
                .enumerate()
                .map(|(i, v)| (format!("arg{}", i), v.clone())),
        );
        Ok(vec![Row { columns }])
    }

    async fn transaction(&self, statements: &[String]) -> Result<(), DriverError> {
        if statements.iter().any(|s| s.trim().is_empty()) {
            return Err(DriverError::InvalidStatement("empty statement".into()));
        }
        self.operate().await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self
            .script
            .lock()
            .unwrap()
            .closes
            .entry(self.name.clone())
            .or_default() += 1;
    }
}

/// Endpoint configs with a short health-check interval.
pub fn endpoints(names: &[&str], interval_ms: u64) -> Vec<EndpointConfig> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut config = EndpointConfig::new(*name, format!("10.0.0.{}", i + 1));
            config.health_check_interval_ms = interval_ms;
            config
        })
        .collect()
}

/// One open attempt per connect, tiny backoff, short drain.
pub fn fast_connect() -> ConnectConfig {
    ConnectConfig {
        max_attempts: 1,
        backoff_unit_ms: 1,
        drain_timeout_ms: 500,
        fail_fast: false,
    }
}

/// Poll `cond` every 5ms until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
