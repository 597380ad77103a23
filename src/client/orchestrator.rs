//! Ordered fallback across providers with per-provider retries.
//!
//! # Algorithm
//! ```text
//! candidates = dedup([primary] + fallbacks)
//! for each candidate:
//!     unknown name      → skip (not an attempt)
//!     circuit open      → last_error = circuit_open, next candidate
//!     up to max_retries attempts:
//!         success       → return payload
//!         not retryable → next candidate
//!         retryable     → backoff (Retry-After wins), re-check circuit, retry
//!         circuit opened by these retries → last real error, next candidate
//! all exhausted → last_error (or "no providers available")
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::client::error::RequestError;
use crate::client::executor::RequestExecutor;
use crate::observability::metrics;
use crate::providers::{Provider, ProviderRegistry};
use crate::resilience::{calculate_backoff, CircuitBreaker};

#[derive(Debug, Clone)]
pub struct FallbackOrchestrator {
    registry: Arc<ProviderRegistry>,
    breaker: Arc<CircuitBreaker>,
    executor: RequestExecutor,
}

/// `[primary] + fallbacks` with duplicates removed, first occurrence kept.
pub fn candidate_order<'a>(primary: &'a str, fallbacks: &'a [String]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    std::iter::once(primary)
        .chain(fallbacks.iter().map(String::as_str))
        .filter(|name| seen.insert(*name))
        .collect()
}

impl FallbackOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        breaker: Arc<CircuitBreaker>,
        executor: RequestExecutor,
    ) -> Self {
        Self { registry, breaker, executor }
    }

    /// Fetch `endpoint` from the first candidate provider that succeeds.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        primary: &str,
        fallbacks: &[String],
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        let mut last_error: Option<RequestError> = None;

        for name in candidate_order(primary, fallbacks) {
            let Some(provider) = self.registry.get(name) else {
                tracing::warn!(provider = %name, "Unknown provider, skipping");
                continue;
            };

            if let Some(previous) = &last_error {
                tracing::info!(
                    from = %previous.provider,
                    to = %provider.name,
                    kind = %previous.kind,
                    "Falling back to next provider"
                );
                metrics::record_fallback(&previous.provider);
            }

            let url = provider.url_for(endpoint);
            match self.try_provider(&provider, &url, params, request_id).await {
                Ok(payload) => return Ok(payload),
                Err(error) => last_error = Some(error),
            }
        }

        match last_error {
            Some(error) => {
                tracing::error!(
                    provider = %error.provider,
                    url = %error.target,
                    kind = %error.kind,
                    "All providers failed"
                );
                Err(error)
            }
            None => {
                tracing::error!(endpoint = %endpoint, "No providers available");
                Err(RequestError::no_providers(endpoint))
            }
        }
    }

    /// Retry loop against one provider. `attempt` is zero-based.
    async fn try_provider(
        &self,
        provider: &Provider,
        url: &str,
        params: &[(String, String)],
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        let mut attempt: u32 = 0;
        let mut previous: Option<RequestError> = None;

        loop {
            // Checked before every attempt: a concurrent caller may have
            // opened the circuit while this one was backing off.
            if !self.breaker.can_execute(&provider.name) {
                return Err(match previous {
                    // Opened mid-loop: report the failure that tripped it.
                    Some(error) => {
                        tracing::warn!(
                            provider = %provider.name,
                            error = %error,
                            "Circuit opened during retries"
                        );
                        error
                    }
                    None => {
                        tracing::warn!(provider = %provider.name, "Circuit breaker open, skipping");
                        RequestError::circuit_open(&provider.name, url)
                    }
                });
            }

            tracing::debug!(
                provider = %provider.name,
                url = %url,
                attempt = attempt + 1,
                max_attempts = provider.max_retries,
                "Sending request"
            );

            let error = match self.executor.execute(url, params, provider, request_id).await {
                Ok(payload) => return Ok(payload),
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::warn!(provider = %provider.name, error = %error, "Non-retryable error");
                return Err(error);
            }

            if attempt + 1 >= provider.max_retries {
                tracing::warn!(provider = %provider.name, error = %error, "All retries exhausted");
                return Err(error);
            }

            let delay = calculate_backoff(attempt, &provider.backoff, error.retry_after);
            tracing::info!(
                provider = %provider.name,
                delay = ?delay,
                next_attempt = attempt + 2,
                max_attempts = provider.max_retries,
                kind = %error.kind,
                "Retrying"
            );
            metrics::record_retry(&provider.name);
            tokio::time::sleep(delay).await;
            previous = Some(error);
            attempt += 1;
        }
    }
}
