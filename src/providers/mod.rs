//! Provider catalogue subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig.providers + defaults.rs
//!     → provider.rs (validate, build immutable Provider)
//!     → registry.rs (name → Arc<Provider>, URL prefix matching)
//!     → orchestrator looks up candidates by name per request
//! ```
//!
//! # Design Decisions
//! - Providers are immutable once built; re-registering swaps in a new Arc
//! - Readers never block writers (arc-swap snapshot per lookup)
//! - Mutable per-provider state (circuit, rate slot) lives in resilience/

pub mod defaults;
pub mod provider;
pub mod registry;

pub use provider::{Provider, DIRECT_PROVIDER};
pub use registry::ProviderRegistry;
