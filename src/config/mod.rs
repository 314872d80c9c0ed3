//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DatabaseConfig (validated, immutable)
//!     → Pool::initialize(endpoints, access_target, connect)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the pool mode is fixed at initialization
//! - All fields except endpoint name/host have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AccessTarget;
pub use schema::ConnectConfig;
pub use schema::DatabaseConfig;
pub use schema::EndpointConfig;
pub use schema::ObservabilityConfig;
