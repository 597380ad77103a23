//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated)
//!     → UpstreamClient::new builds immutable Providers from it
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Providers registered at runtime go through the same validation

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BreakerConfig, ClientConfig, DirectConfig, ObservabilityConfig, ProviderConfig};
pub use validation::ValidationError;
