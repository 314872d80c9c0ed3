//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (access target references an existing endpoint)
//! - Validate value ranges (ports, intervals, pool sizes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DatabaseConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{AccessTarget, DatabaseConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoEndpoints,
    EmptyName { index: usize },
    EmptyHost { endpoint: String },
    DuplicateName { endpoint: String },
    InvalidPort { endpoint: String },
    IdleExceedsMax { endpoint: String, idle: u32, max: u32 },
    ZeroInterval { endpoint: String },
    ZeroAttempts,
    UnknownAccessTarget { target: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoEndpoints => write!(f, "no endpoints configured"),
            ValidationError::EmptyName { index } => {
                write!(f, "endpoint #{} has an empty name", index)
            }
            ValidationError::EmptyHost { endpoint } => {
                write!(f, "endpoint '{}' has an empty host", endpoint)
            }
            ValidationError::DuplicateName { endpoint } => {
                write!(f, "endpoint name '{}' is used more than once", endpoint)
            }
            ValidationError::InvalidPort { endpoint } => {
                write!(f, "endpoint '{}' has port 0", endpoint)
            }
            ValidationError::IdleExceedsMax { endpoint, idle, max } => write!(
                f,
                "endpoint '{}': max_idle_connections {} exceeds max_connections {}",
                endpoint, idle, max
            ),
            ValidationError::ZeroInterval { endpoint } => {
                write!(f, "endpoint '{}': health_check_interval_ms must be > 0", endpoint)
            }
            ValidationError::ZeroAttempts => write!(f, "connect.max_attempts must be >= 1"),
            ValidationError::UnknownAccessTarget { target } => {
                write!(f, "access_target '{}' matches no endpoint", target)
            }
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DatabaseConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for (index, ep) in config.endpoints.iter().enumerate() {
        if ep.name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
            continue;
        }
        if !seen.insert(ep.name.as_str()) {
            errors.push(ValidationError::DuplicateName {
                endpoint: ep.name.clone(),
            });
        }
        if ep.host.is_empty() {
            errors.push(ValidationError::EmptyHost {
                endpoint: ep.name.clone(),
            });
        }
        if ep.port == 0 {
            errors.push(ValidationError::InvalidPort {
                endpoint: ep.name.clone(),
            });
        }
        if ep.max_idle_connections > ep.max_connections {
            errors.push(ValidationError::IdleExceedsMax {
                endpoint: ep.name.clone(),
                idle: ep.max_idle_connections,
                max: ep.max_connections,
            });
        }
        if ep.health_check_interval_ms == 0 {
            errors.push(ValidationError::ZeroInterval {
                endpoint: ep.name.clone(),
            });
        }
    }

    if config.connect.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }

    if let AccessTarget::Named(target) = &config.access_target {
        if !config.endpoints.iter().any(|ep| &ep.name == target) {
            errors.push(ValidationError::UnknownAccessTarget {
                target: target.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
