//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a provider:
//!     → circuit_breaker.rs (gate: may this provider be called?)
//!     → rate_limit.rs (wait for the provider's next slot)
//!     → executor sends the request
//!     → circuit_breaker.rs (record success / failure)
//!     → On retryable failure: backoff.rs (delay before next attempt)
//! ```
//!
//! # Design Decisions
//! - Per-provider state, never one global lock
//! - No lock is held across an await point
//! - Jittered backoff prevents synchronized retry storms
//! - An upstream Retry-After overrides the computed backoff

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;

pub use backoff::{calculate_backoff, BackoffPolicy};
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use rate_limit::RateLimiter;
