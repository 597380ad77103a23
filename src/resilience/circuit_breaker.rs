//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: provider assumed down, requests fail fast
//! - Half-Open: recovery timeout elapsed, one probe admitted
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: recovery_timeout since last failure
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails (re-arms the timeout)
//! ```
//!
//! Half-open is not stored as a state: it is the probe permit handed out by
//! `can_execute`. A permit older than `recovery_timeout` is considered lost
//! (its request was cancelled) and another probe may be admitted.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::schema::BreakerConfig;
use crate::observability::metrics;

/// Per-provider breaker state.
#[derive(Debug, Clone, Default)]
pub struct CircuitState {
    pub is_open: bool,
    pub consecutive_failures: u32,
    pub last_failure: Option<Instant>,
    pub last_success: Option<Instant>,
    probe_started: Option<Instant>,
}

/// Read-only view of a provider's circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub provider: String,
    pub is_open: bool,
    pub consecutive_failures: u32,
    pub since_last_failure: Option<Duration>,
    pub since_last_success: Option<Duration>,
}

/// Tracks health per provider; each provider's state has its own lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    circuits: DashMap<String, Arc<Mutex<CircuitState>>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            circuits: DashMap::new(),
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_secs(config.recovery_timeout_secs),
        )
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Fetch (or lazily create) the state cell for a provider. The map shard
    /// is only locked for the lookup.
    fn circuit(&self, provider: &str) -> Arc<Mutex<CircuitState>> {
        if let Some(circuit) = self.circuits.get(provider) {
            return circuit.clone();
        }
        self.circuits
            .entry(provider.to_string())
            .or_default()
            .clone()
    }

    fn with_state<R>(&self, provider: &str, f: impl FnOnce(&mut CircuitState) -> R) -> R {
        let circuit = self.circuit(provider);
        let mut state = circuit.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Whether a request to `provider` may be attempted now.
    pub fn can_execute(&self, provider: &str) -> bool {
        let recovery_timeout = self.recovery_timeout;
        self.with_state(provider, |state| {
            if !state.is_open {
                return true;
            }

            let now = Instant::now();
            let cooling = state
                .last_failure
                .is_some_and(|at| now.duration_since(at) < recovery_timeout);
            if cooling {
                return false;
            }

            match state.probe_started {
                Some(started) if now.duration_since(started) < recovery_timeout => false,
                _ => {
                    state.probe_started = Some(now);
                    tracing::info!(provider = %provider, "Circuit half-open, admitting probe");
                    true
                }
            }
        })
    }

    /// Record a successful request, closing the circuit if open.
    pub fn record_success(&self, provider: &str) {
        self.with_state(provider, |state| {
            state.last_success = Some(Instant::now());
            state.consecutive_failures = 0;
            state.probe_started = None;

            if state.is_open {
                state.is_open = false;
                tracing::info!(provider = %provider, "Circuit closed");
                metrics::record_circuit_state(provider, false);
            }
        })
    }

    /// Record a failed request, opening the circuit at the threshold.
    pub fn record_failure(&self, provider: &str) {
        let threshold = self.failure_threshold;
        self.with_state(provider, |state| {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            state.last_failure = Some(Instant::now());
            state.probe_started = None;

            if state.is_open {
                tracing::debug!(
                    provider = %provider,
                    failures = state.consecutive_failures,
                    "Probe failed, circuit stays open"
                );
            } else if state.consecutive_failures >= threshold {
                state.is_open = true;
                tracing::warn!(
                    provider = %provider,
                    failures = state.consecutive_failures,
                    "Circuit opened"
                );
                metrics::record_circuit_state(provider, true);
            }
        })
    }

    /// Force a provider's circuit back to closed.
    pub fn reset(&self, provider: &str) {
        self.with_state(provider, |state| {
            let was_open = state.is_open;
            *state = CircuitState::default();
            if was_open {
                tracing::info!(provider = %provider, "Circuit reset");
                metrics::record_circuit_state(provider, false);
            }
        })
    }

    pub fn snapshot(&self, provider: &str) -> CircuitSnapshot {
        self.with_state(provider, |state| snapshot_of(provider, state))
    }

    /// Snapshots of every provider referenced so far, sorted by name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let names: Vec<String> = self.circuits.iter().map(|e| e.key().clone()).collect();
        let mut snapshots: Vec<CircuitSnapshot> =
            names.iter().map(|name| self.snapshot(name)).collect();
        snapshots.sort_by(|a, b| a.provider.cmp(&b.provider));
        snapshots
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

fn snapshot_of(provider: &str, state: &CircuitState) -> CircuitSnapshot {
    let now = Instant::now();
    CircuitSnapshot {
        provider: provider.to_string(),
        is_open: state.is_open,
        consecutive_failures: state.consecutive_failures,
        since_last_failure: state.last_failure.map(|at| now.duration_since(at)),
        since_last_success: state.last_success.map(|at| now.duration_since(at)),
    }
}
