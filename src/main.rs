//! upstream-client CLI
//!
//! Issues one resilient GET through the provider registry and prints the
//! JSON payload, or the structured error report on failure.
//!
//! ```text
//!   upstream-client get /public/ticker -p instrument_name=BTC-PERPETUAL
//!        │
//!        ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────┐
//!   │ orchestrator │──▶│ circuit gate │──▶│ rate limiter│──▶│  executor  │──▶ provider
//!   │ (fallbacks)  │◀──│ (per provider│◀──│ (per        │◀──│ (GET,      │
//!   └──────────────┘   │  breaker)    │   │  provider)  │   │  classify) │
//!        │             └──────────────┘   └─────────────┘   └────────────┘
//!        ▼
//!   payload on stdout / error report on stderr
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use upstream_client::config::{load_config, ClientConfig};
use upstream_client::observability::{logging, metrics};
use upstream_client::{UpstreamClient, UpstreamRequest};

#[derive(Parser)]
#[command(name = "upstream-client")]
#[command(about = "Resilient JSON fetcher with retries, circuit breaking and provider fallback", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an endpoint path or full URL
    Get {
        /// Endpoint path (e.g. /public/ticker) or full URL
        target: String,

        /// Query parameter as KEY=VALUE (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Primary provider
        #[arg(long)]
        provider: Option<String>,

        /// Fallback provider (repeatable, tried in order)
        #[arg(long = "fallback")]
        fallbacks: Vec<String>,
    },
    /// List registered providers
    Providers,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = UpstreamClient::new(&config)?;

    match cli.command {
        Commands::Get {
            target,
            params,
            provider,
            fallbacks,
        } => {
            let request = UpstreamRequest {
                target,
                params,
                provider,
                fallbacks,
            };

            match client.request(&request).await {
                Ok(payload) => {
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(error) => {
                    tracing::error!(error = %error, "Request failed");
                    eprintln!("{}", serde_json::to_string_pretty(&error)?);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Providers => {
            let providers: Vec<_> = client
                .registry()
                .all()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "base_url": p.base_url,
                        "timeout_ms": p.timeout.as_millis() as u64,
                        "max_retries": p.max_retries,
                        "min_interval_ms": p.min_interval.map(|d| d.as_millis() as u64),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&providers)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("a=b").unwrap(), ("a".to_string(), "b".to_string()));
        assert_eq!(parse_param("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_cli_parses_get() {
        let cli = Cli::try_parse_from([
            "upstream-client",
            "get",
            "/fapi/v1/premiumIndex",
            "-p",
            "symbol=BTCUSDT",
            "--provider",
            "binance",
            "--fallback",
            "binance_spot",
        ])
        .unwrap();

        match cli.command {
            Commands::Get { target, params, provider, fallbacks } => {
                assert_eq!(target, "/fapi/v1/premiumIndex");
                assert_eq!(params, vec![("symbol".to_string(), "BTCUSDT".to_string())]);
                assert_eq!(provider.as_deref(), Some("binance"));
                assert_eq!(fallbacks, vec!["binance_spot"]);
            }
            Commands::Providers => panic!("expected get"),
        }
    }
}
