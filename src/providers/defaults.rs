//! Built-in provider catalogue.

use std::collections::BTreeMap;

use crate::config::schema::ProviderConfig;

fn builtin(
    name: &str,
    base_url: &str,
    timeout_ms: u64,
    max_retries: u32,
    backoff_base_ms: u64,
    rate_limit_per_second: Option<f64>,
) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        timeout_ms,
        max_retries,
        backoff_base_ms,
        backoff_cap_ms: 30_000,
        jitter: 0.1,
        headers: BTreeMap::new(),
        rate_limit_per_second,
    }
}

/// Providers every registry starts with unless disabled in config.
pub fn builtin_providers() -> Vec<ProviderConfig> {
    vec![
        builtin("deribit", "https://www.deribit.com/api/v2", 30_000, 3, 1_000, Some(10.0)),
        builtin("binance", "https://fapi.binance.com", 15_000, 3, 500, Some(20.0)),
        builtin("binance_spot", "https://api.binance.com", 15_000, 3, 500, None),
        builtin("coinglass", "https://open-api.coinglass.com", 20_000, 2, 2_000, None),
    ]
}

pub fn builtin_names() -> Vec<&'static str> {
    vec!["deribit", "binance", "binance_spot", "coinglass"]
}
