//! Resilient outbound HTTP client for unreliable upstream data providers.
//!
//! Requests are routed through a provider registry, gated by a per-provider
//! circuit breaker, paced by a per-provider rate limiter, retried with
//! jittered exponential backoff and, when a provider stays down, handed to
//! the next provider in an ordered fallback chain.

pub mod client;
pub mod config;
pub mod observability;
pub mod providers;
pub mod resilience;

pub use client::{ErrorKind, RequestError, UpstreamClient, UpstreamRequest};
pub use config::schema::{ClientConfig, ProviderConfig};
