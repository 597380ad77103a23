//! Upstream client subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamClient::request(UpstreamRequest)
//!     → full URL owned by a provider? strip base, route through it
//!     → full URL nobody owns?        executor.send (pass-through, no retry/circuit)
//!     → endpoint path                primary = provider or default_provider
//!     → orchestrator.rs (candidates, circuit gate, retry loop, fallback)
//!     → executor.rs (rate limit, GET, classify, record outcome)
//!     → JSON payload or RequestError
//! ```
//!
//! # Design Decisions
//! - One explicitly constructed client, shared by reference; no global
//! - Expected failures are values (`Result<_, RequestError>`), never panics
//! - Each attempt gets the provider's full timeout; there is no overall
//!   deadline across retries and fallbacks
//! - Cancellation is dropping the returned future; it records nothing on the
//!   breaker and hands back an unreached rate-limit slot if it is the latest

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod request;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

pub use error::{classify, retryable, ErrorKind, FailureSignal, RequestError};
pub use executor::RequestExecutor;
pub use orchestrator::{candidate_order, FallbackOrchestrator};
pub use request::UpstreamRequest;

use crate::config::schema::{ClientConfig, ProviderConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ConfigError;
use crate::providers::{defaults, Provider, ProviderRegistry};
use crate::resilience::{CircuitBreaker, CircuitSnapshot, RateLimiter};

/// Resilient entry point for outbound provider requests.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    registry: Arc<ProviderRegistry>,
    breaker: Arc<CircuitBreaker>,
    executor: RequestExecutor,
    orchestrator: FallbackOrchestrator,
    direct: Arc<Provider>,
    default_provider: Option<String>,
}

impl UpstreamClient {
    /// Build a client from a configuration, validating it first.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        validate_config(config, &defaults::builtin_names()).map_err(ConfigError::Validation)?;

        let registry = if config.include_builtin_providers {
            ProviderRegistry::with_builtins()
        } else {
            ProviderRegistry::empty()
        };
        for provider in &config.providers {
            registry
                .register(provider.clone())
                .map_err(ConfigError::Validation)?;
        }

        let mut http = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if !config.use_system_proxy {
            http = http.no_proxy();
        }
        let http = http.build()?;

        let registry = Arc::new(registry);
        let breaker = Arc::new(CircuitBreaker::from_config(&config.breaker));
        let limiter = Arc::new(RateLimiter::new());
        let executor = RequestExecutor::new(http, limiter, breaker.clone());
        let orchestrator =
            FallbackOrchestrator::new(registry.clone(), breaker.clone(), executor.clone());

        tracing::info!(
            providers = registry.len(),
            default_provider = ?config.default_provider,
            failure_threshold = breaker.failure_threshold(),
            recovery_timeout = ?breaker.recovery_timeout(),
            "Upstream client initialized"
        );

        Ok(Self {
            registry,
            breaker,
            executor,
            orchestrator,
            direct: Arc::new(Provider::direct(Duration::from_millis(config.direct.timeout_ms))),
            default_provider: config.default_provider.clone(),
        })
    }

    /// Client with the built-in providers and default policy.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(&ClientConfig::default())
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Add or replace a provider at runtime.
    pub fn register_provider(&self, config: ProviderConfig) -> Result<(), Vec<ValidationError>> {
        self.registry.register(config)
    }

    pub fn circuit(&self, provider: &str) -> CircuitSnapshot {
        self.breaker.snapshot(provider)
    }

    /// Fetch a target with no explicit provider or fallbacks.
    pub async fn get(&self, target: &str) -> Result<Value, RequestError> {
        self.request(&UpstreamRequest::new(target)).await
    }

    /// Fetch a JSON document, retrying and falling back as configured.
    pub async fn request(&self, request: &UpstreamRequest) -> Result<Value, RequestError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "upstream_request",
            request_id = %request_id,
            endpoint = %request.target
        );
        self.dispatch(request, request_id).instrument(span).await
    }

    async fn dispatch(
        &self,
        request: &UpstreamRequest,
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        if request.is_full_url() {
            if let Some((provider, endpoint)) = self.registry.match_url(&request.target) {
                tracing::debug!(provider = %provider.name, endpoint = %endpoint, "URL matched provider");
                return self
                    .orchestrator
                    .request(endpoint, &request.params, &provider.name, &request.fallbacks, request_id)
                    .await;
            }

            tracing::debug!("No provider owns URL, sending direct");
            return self
                .executor
                .send(&request.target, &request.params, &self.direct, request_id)
                .await;
        }

        let primary = request
            .provider
            .as_deref()
            .or(self.default_provider.as_deref());

        match (primary, request.fallbacks.split_first()) {
            (Some(primary), _) => {
                self.orchestrator
                    .request(&request.target, &request.params, primary, &request.fallbacks, request_id)
                    .await
            }
            (None, Some((first, rest))) => {
                self.orchestrator
                    .request(&request.target, &request.params, first, rest, request_id)
                    .await
            }
            (None, None) => {
                tracing::error!(endpoint = %request.target, "No provider named and no default configured");
                Err(RequestError::no_providers(&request.target))
            }
        }
    }
}
