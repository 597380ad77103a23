//! Validated, immutable provider policy.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::schema::ProviderConfig;
use crate::config::validation::{validate_provider, ValidationError};
use crate::resilience::backoff::BackoffPolicy;

/// Name reported for pass-through requests to unregistered URLs.
pub const DIRECT_PROVIDER: &str = "direct";

/// One upstream target with its own timeout, retry, backoff and rate policy.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
    /// Attempts allowed per request (always at least 1).
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    pub headers: HeaderMap,
    /// Minimum spacing between requests, if rate limited.
    pub min_interval: Option<Duration>,
}

impl Provider {
    /// Validate a provider definition and build its runtime form.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Vec<ValidationError>> {
        validate_provider(config)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            // Both already checked by validate_provider.
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            backoff: BackoffPolicy {
                base: Duration::from_millis(config.backoff_base_ms),
                cap: Duration::from_millis(config.backoff_cap_ms),
                jitter: config.jitter,
            },
            headers,
            min_interval: config
                .rate_limit_per_second
                .and_then(|rate| Duration::try_from_secs_f64(1.0 / rate).ok()),
        })
    }

    /// Policy for a one-off request to a URL no provider claims.
    pub fn direct(timeout: Duration) -> Self {
        Self {
            name: DIRECT_PROVIDER.to_string(),
            base_url: String::new(),
            timeout,
            max_retries: 1,
            backoff: BackoffPolicy::default(),
            headers: HeaderMap::new(),
            min_interval: None,
        }
    }

    /// Full URL for an endpoint path on this provider.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.is_empty() || endpoint.starts_with('/') || endpoint.starts_with('?') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// If `url` lives under this provider's base URL, return the endpoint part.
    ///
    /// The prefix must end on a path or query boundary, so
    /// `https://api.example.com` does not claim `https://api.example.com.evil`.
    pub fn endpoint_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.base_url.is_empty() {
            return None;
        }
        let rest = url.strip_prefix(self.base_url.as_str())?;
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
            Some(rest)
        } else {
            None
        }
    }
}
