//! Single-attempt request execution.
//!
//! # Responsibilities
//! - Wait for the provider's rate-limit slot
//! - Issue one GET with the provider's timeout and static headers
//! - Classify transport, status and body failures
//! - Feed the outcome to the circuit breaker (`execute` only)

use std::sync::Arc;

use reqwest::header::RETRY_AFTER;
use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::client::error::{classify, FailureSignal, RequestError};
use crate::observability::metrics;
use crate::providers::Provider;
use crate::resilience::{CircuitBreaker, RateLimiter};

/// Header carrying the per-call correlation ID upstream.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
}

impl RequestExecutor {
    pub fn new(
        http: reqwest::Client,
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self { http, limiter, breaker }
    }

    /// One attempt, with exactly one circuit breaker update.
    ///
    /// The breaker is only updated once the transport call has returned, so
    /// dropping this future mid-flight records neither success nor failure.
    pub async fn execute(
        &self,
        url: &str,
        params: &[(String, String)],
        provider: &Provider,
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        let result = self.send(url, params, provider, request_id).await;
        match &result {
            Ok(_) => self.breaker.record_success(&provider.name),
            Err(_) => self.breaker.record_failure(&provider.name),
        }
        result
    }

    /// One attempt without touching the circuit breaker (pass-through mode).
    pub async fn send(
        &self,
        url: &str,
        params: &[(String, String)],
        provider: &Provider,
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        self.limiter.await_turn(provider).await;

        let started = Instant::now();
        let result = self.fetch(url, params, provider, request_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind.as_str(),
        };
        metrics::record_attempt(&provider.name, outcome, started);

        match &result {
            Ok(_) => tracing::debug!(
                provider = %provider.name,
                url = %url,
                elapsed = ?started.elapsed(),
                "Upstream request succeeded"
            ),
            Err(e) => tracing::debug!(
                provider = %provider.name,
                url = %url,
                kind = %e.kind,
                status = ?e.status_code,
                "Upstream request failed"
            ),
        }
        result
    }

    async fn fetch(
        &self,
        url: &str,
        params: &[(String, String)],
        provider: &Provider,
        request_id: Uuid,
    ) -> Result<Value, RequestError> {
        let mut builder = self
            .http
            .get(url)
            .timeout(provider.timeout)
            .headers(provider.headers.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if !params.is_empty() {
            builder = builder.query(params);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, &provider.name, url))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(classify(
                FailureSignal::Status {
                    code: status.as_u16(),
                    retry_after,
                },
                &provider.name,
                url,
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, &provider.name, url))?;

        serde_json::from_slice::<Value>(&body).map_err(|e| {
            classify(
                FailureSignal::MalformedBody { detail: e.to_string() },
                &provider.name,
                url,
            )
            .with_cause(e)
        })
    }
}

/// Classify a reqwest failure. Connect errors win over timeouts.
fn transport_error(error: reqwest::Error, provider: &str, target: &str) -> RequestError {
    let detail = error.to_string();
    let signal = if error.is_connect() {
        FailureSignal::Transport { detail }
    } else if error.is_timeout() {
        FailureSignal::TimedOut
    } else if error.is_request() || error.is_body() {
        FailureSignal::Transport { detail }
    } else {
        FailureSignal::Other { detail }
    };
    classify(signal, provider, target).with_cause(error)
}
