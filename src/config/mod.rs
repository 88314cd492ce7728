//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or builder calls
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BreakerConfig (validated, immutable)
//!     → read once when a breaker is constructed
//! ```
//!
//! # Design Decisions
//! - Thresholds are fixed for the lifetime of a breaker
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Construction fails fast on invalid values, never at call time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BreakerConfig, LockingMode, ObservabilityConfig, Settings};
pub use validation::{validate_config, ValidationError};
