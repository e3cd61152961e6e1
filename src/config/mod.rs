//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! LOG_CONFIG_PATH / ./log-config.yaml / deployment path / built-in
//!     → resolver.rs (pick one source)
//!     → loader.rs (read & deserialize YAML)
//!     → validation.rs (semantic checks)
//!     → LoggingSpec (validated, immutable)
//!     → observability::logging builds the handlers
//!
//! ATHENA_* environment variables
//!     → athena.rs (AthenaSettings)
//!     → athena::AthenaClient
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal documents
//! - Validation separates syntactic (serde) from semantic checks

pub mod athena;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use athena::AthenaSettings;
pub use loader::{load_logging_config, ConfigError};
pub use resolver::{LogConfigResolver, LogSource};
pub use schema::LoggingConfig;
pub use validation::{LoggingSpec, ValidationError};
