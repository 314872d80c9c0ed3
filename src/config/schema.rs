//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pool.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Access target value selecting round-robin mode.
pub const ROUND_ROBIN: &str = "ROUND_ROBIN";

/// Root configuration for the database access layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `"ROUND_ROBIN"` or the name of a single endpoint.
    pub access_target: AccessTarget,

    /// Connection establishment and shutdown settings.
    pub connect: ConnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Database endpoint definitions.
    pub endpoints: Vec<EndpointConfig>,
}

/// Which endpoint(s) serve requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(from = "String", into = "String")]
pub enum AccessTarget {
    /// Cycle through every workable endpoint.
    #[default]
    RoundRobin,
    /// Pin all traffic to the named endpoint.
    Named(String),
}

impl AccessTarget {
    pub fn parse(s: &str) -> Self {
        if s == ROUND_ROBIN {
            AccessTarget::RoundRobin
        } else {
            AccessTarget::Named(s.to_string())
        }
    }
}

impl From<String> for AccessTarget {
    fn from(s: String) -> Self {
        AccessTarget::parse(&s)
    }
}

impl From<&str> for AccessTarget {
    fn from(s: &str) -> Self {
        AccessTarget::parse(s)
    }
}

impl From<AccessTarget> for String {
    fn from(t: AccessTarget) -> Self {
        t.to_string()
    }
}

impl fmt::Display for AccessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessTarget::RoundRobin => f.write_str(ROUND_ROBIN),
            AccessTarget::Named(name) => f.write_str(name),
        }
    }
}

/// One database endpoint.
#[derive(Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Unique endpoint identifier within a pool.
    pub name: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub database: String,

    /// Maximum open connections held by the driver for this endpoint.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Maximum idle connections kept by the driver.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: u32,

    /// Recovery probe interval in milliseconds.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    10
}

fn default_max_idle_connections() -> u32 {
    2
}

fn default_health_check_interval_ms() -> u64 {
    5_000
}

impl EndpointConfig {
    /// Minimal endpoint with defaults for everything but name and host.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_connections: default_max_connections(),
            max_idle_connections: default_max_idle_connections(),
            health_check_interval_ms: default_health_check_interval_ms(),
        }
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// libpq-style connection string with the password masked, for logs.
    pub fn redacted_dsn(&self) -> String {
        format!(
            "host={} port={} user={} password=*** dbname={}",
            self.host, self.port, self.user, self.database
        )
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("health_check_interval_ms", &self.health_check_interval_ms)
            .finish()
    }
}

/// Connection establishment settings shared by all endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Open attempts per `connect()` call.
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n * unit`.
    pub backoff_unit_ms: u64,

    /// How long `close()` waits for in-flight operations in milliseconds.
    pub drain_timeout_ms: u64,

    /// Fail initialization when no endpoint is workable afterwards.
    pub fail_fast: bool,
}

impl ConnectConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff_unit_ms: 1_000,
            drain_timeout_ms: 5_000,
            fail_fast: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9187".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_target_parse() {
        assert_eq!(AccessTarget::parse("ROUND_ROBIN"), AccessTarget::RoundRobin);
        assert_eq!(
            AccessTarget::parse("primary"),
            AccessTarget::Named("primary".into())
        );
        // case sensitive, like the endpoint names it may refer to
        assert_eq!(
            AccessTarget::parse("round_robin"),
            AccessTarget::Named("round_robin".into())
        );
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: DatabaseConfig = toml::from_str(
            r#"
            access_target = "replica"

            [[endpoints]]
            name = "replica"
            host = "10.0.0.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.access_target, AccessTarget::Named("replica".into()));
        assert_eq!(config.endpoints.len(), 1);
        let ep = &config.endpoints[0];
        assert_eq!(ep.port, 5432);
        assert_eq!(ep.health_check_interval(), Duration::from_secs(5));
        assert_eq!(config.connect.max_attempts, 20);
        assert_eq!(config.connect.backoff_unit(), Duration::from_secs(1));
    }

    #[test]
    fn test_debug_masks_password() {
        let mut ep = EndpointConfig::new("a", "localhost");
        ep.password = "hunter2".into();
        assert!(!format!("{:?}", ep).contains("hunter2"));
        assert!(!ep.redacted_dsn().contains("hunter2"));
    }
}
