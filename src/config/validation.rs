//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and references.
//! Validation is a pure function and returns every problem found, not just
//! the first.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{ClientConfig, ProviderConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("provider name must not be empty")]
    EmptyName,

    #[error("provider '{name}': invalid base_url '{url}': {reason}")]
    InvalidBaseUrl { name: String, url: String, reason: String },

    #[error("provider '{name}': timeout_ms must be greater than zero")]
    ZeroTimeout { name: String },

    #[error("provider '{name}': max_retries must be at least 1")]
    ZeroRetries { name: String },

    #[error("provider '{name}': backoff_base_ms must be greater than zero")]
    ZeroBackoffBase { name: String },

    #[error("provider '{name}': backoff_cap_ms must be greater than zero")]
    ZeroBackoffCap { name: String },

    #[error("provider '{name}': jitter {jitter} must be in [0, 1)")]
    JitterOutOfRange { name: String, jitter: f64 },

    #[error("provider '{name}': rate_limit_per_second {rate} must be a positive number with a representable interval")]
    InvalidRate { name: String, rate: f64 },

    #[error("provider '{name}': invalid header '{header}'")]
    InvalidHeader { name: String, header: String },

    #[error("provider '{name}' is defined more than once")]
    DuplicateProvider { name: String },

    #[error("default_provider '{name}' is not a known provider")]
    UnknownDefaultProvider { name: String },

    #[error("breaker.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("direct.timeout_ms must be greater than zero")]
    ZeroDirectTimeout,
}

/// Validate a single provider definition.
pub fn validate_provider(config: &ProviderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let name = config.name.clone();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    match Url::parse(&config.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidBaseUrl {
            name: name.clone(),
            url: config.base_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidBaseUrl {
            name: name.clone(),
            url: config.base_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { name: name.clone() });
    }
    if config.max_retries == 0 {
        errors.push(ValidationError::ZeroRetries { name: name.clone() });
    }
    if config.backoff_base_ms == 0 {
        errors.push(ValidationError::ZeroBackoffBase { name: name.clone() });
    }
    if config.backoff_cap_ms == 0 {
        errors.push(ValidationError::ZeroBackoffCap { name: name.clone() });
    }
    if !(0.0..1.0).contains(&config.jitter) {
        errors.push(ValidationError::JitterOutOfRange {
            name: name.clone(),
            jitter: config.jitter,
        });
    }
    if let Some(rate) = config.rate_limit_per_second {
        let interval_ok = Duration::try_from_secs_f64(1.0 / rate).is_ok();
        if !rate.is_finite() || rate <= 0.0 || !interval_ok {
            errors.push(ValidationError::InvalidRate { name: name.clone(), rate });
        }
    }
    for (header, value) in &config.headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err()
            || HeaderValue::from_str(value).is_err()
        {
            errors.push(ValidationError::InvalidHeader {
                name: name.clone(),
                header: header.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a full client configuration.
///
/// `builtin_names` lists providers that exist without being declared in the
/// file, so `default_provider` may refer to them.
pub fn validate_config(
    config: &ClientConfig,
    builtin_names: &[&str],
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }
    if config.direct.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDirectTimeout);
    }

    for provider in &config.providers {
        if !seen.insert(provider.name.as_str()) {
            errors.push(ValidationError::DuplicateProvider {
                name: provider.name.clone(),
            });
        }
        if let Err(provider_errors) = validate_provider(provider) {
            errors.extend(provider_errors);
        }
    }

    if let Some(default) = &config.default_provider {
        let builtin = config.include_builtin_providers && builtin_names.contains(&default.as_str());
        if !builtin && !seen.contains(default.as_str()) {
            errors.push(ValidationError::UnknownDefaultProvider {
                name: default.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_provider() {
        let config = ProviderConfig::new("kraken", "https://api.kraken.com");
        assert!(validate_provider(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProviderConfig::new("", "ftp://example.com");
        config.timeout_ms = 0;
        config.max_retries = 0;
        config.jitter = 1.0;
        config.rate_limit_per_second = Some(0.0);
        config.headers.insert("bad header".into(), "v".into());

        let errors = validate_provider(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyName));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidBaseUrl { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroTimeout { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroRetries { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::JitterOutOfRange { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidRate { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHeader { .. })));
    }

    #[test]
    fn test_rate_too_small_for_interval_rejected() {
        let mut config = ProviderConfig::new("slow", "https://slow.example");
        config.rate_limit_per_second = Some(1e-20);
        let errors = validate_provider(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidRate { .. }));

        config.rate_limit_per_second = Some(0.001);
        assert!(validate_provider(&config).is_ok());
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let config = ProviderConfig::new("rel", "/api/v2");
        let errors = validate_provider(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_duplicate_and_unknown_default() {
        let mut config = ClientConfig::default();
        config.include_builtin_providers = false;
        config.providers.push(ProviderConfig::new("a", "https://a.example"));
        config.providers.push(ProviderConfig::new("a", "https://a2.example"));

        let errors = validate_config(&config, &["deribit"]).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateProvider { name: "a".into() }));
        assert!(errors.contains(&ValidationError::UnknownDefaultProvider {
            name: "deribit".into()
        }));
    }

    #[test]
    fn test_default_provider_may_be_builtin() {
        let config = ClientConfig::default();
        assert!(validate_config(&config, &["deribit", "binance"]).is_ok());
    }
}
