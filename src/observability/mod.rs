//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client, executor, breaker, limiter produce:
//!     → logging.rs (structured tracing events, request_id span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (provider, target, attempt, kind) instead of prose
//! - Request ID flows into the outbound x-request-id header
//! - Metrics go through the `metrics` facade; the exporter is opt-in

pub mod logging;
pub mod metrics;
