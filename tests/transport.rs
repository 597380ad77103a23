//! Transport-level behaviour: timeouts, connect failures, headers,
//! URL routing and pass-through requests.

use std::time::Duration;

use upstream_client::{ClientConfig, ErrorKind, UpstreamClient, UpstreamRequest};

mod common;

use common::{client_with, closed_port_url, provider, start_mock_backend, start_programmable_backend, MockResponse};

#[tokio::test]
async fn test_timeout_is_classified() {
    let x = start_mock_backend(MockResponse::ok("{}").with_delay(Duration::from_secs(2))).await;
    let mut config = provider("x", &x.base_url(), 1);
    config.timeout_ms = 200;
    let client = client_with(vec![config]);

    let err = client
        .request(&UpstreamRequest::new("/slow").provider("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.is_retryable());
    assert_eq!(client.circuit("x").consecutive_failures, 1);
}

#[tokio::test]
async fn test_connection_refused_is_network() {
    let base = closed_port_url().await;
    let client = client_with(vec![provider("x", &base, 2)]);

    let err = client
        .request(&UpstreamRequest::new("/ticker").provider("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.provider, "x");
    assert_eq!(client.circuit("x").consecutive_failures, 2);
}

#[tokio::test]
async fn test_static_headers_and_request_id_sent() {
    let x = start_mock_backend(MockResponse::ok("{}")).await;
    let mut config = provider("x", &x.base_url(), 1);
    config.headers.insert("X-Api-Key".to_string(), "secret".to_string());
    let client = client_with(vec![config]);

    client
        .request(&UpstreamRequest::new("/ticker").provider("x"))
        .await
        .unwrap();

    let requests = x.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("x-api-key: secret"));
    assert!(requests[0].contains("x-request-id: "));
}

#[tokio::test]
async fn test_request_id_stable_across_retries() {
    let x = start_programmable_backend(|index| async move {
        if index == 0 {
            MockResponse::new(503, "busy")
        } else {
            MockResponse::ok("{}")
        }
    })
    .await;
    let client = client_with(vec![provider("x", &x.base_url(), 2)]);

    client
        .request(&UpstreamRequest::new("/ticker").provider("x"))
        .await
        .unwrap();

    let ids: Vec<String> = x
        .requests()
        .iter()
        .filter_map(|head| {
            head.lines()
                .find_map(|line| line.strip_prefix("x-request-id: "))
                .map(str::to_string)
        })
        .collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_query_params_in_request_line() {
    let x = start_mock_backend(MockResponse::ok("{}")).await;
    let client = client_with(vec![provider("x", &x.base_url(), 1)]);

    client
        .request(
            &UpstreamRequest::new("/public/ticker")
                .provider("x")
                .param("instrument_name", "BTC-PERPETUAL")
                .param("depth", "5"),
        )
        .await
        .unwrap();

    let head = &x.requests()[0];
    let request_line = head.lines().next().unwrap();
    assert_eq!(
        request_line,
        "get /public/ticker?instrument_name=btc-perpetual&depth=5 http/1.1"
    );
}

#[tokio::test]
async fn test_full_url_routes_through_owning_provider() {
    let x = start_programmable_backend(|index| async move {
        if index == 0 {
            MockResponse::new(500, "oops")
        } else {
            MockResponse::ok(r#"{"routed":true}"#)
        }
    })
    .await;
    let client = client_with(vec![provider("x", &x.base_url(), 3)]);

    let payload = client
        .get(&format!("{}/api/v1/price", x.base_url()))
        .await
        .unwrap();

    assert_eq!(payload["routed"], true);
    assert_eq!(x.hits(), 2, "owned URLs get the provider's retry policy");
    assert!(x.requests()[1].starts_with("get /api/v1/price "));
}

#[tokio::test]
async fn test_direct_pass_through_success() {
    let outside = start_mock_backend(MockResponse::ok(r#"{"direct":true}"#)).await;
    let client = client_with(Vec::new());

    let payload = client
        .get(&format!("{}/status", outside.base_url()))
        .await
        .unwrap();

    assert_eq!(payload["direct"], true);
    assert_eq!(outside.hits(), 1);
}

#[tokio::test]
async fn test_direct_pass_through_failure_not_retried() {
    let outside = start_mock_backend(MockResponse::new(500, "down")).await;
    let client = client_with(Vec::new());
    let url = format!("{}/status", outside.base_url());

    let err = client.get(&url).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.provider, "direct");
    assert_eq!(err.target, url);
    assert_eq!(outside.hits(), 1);
    assert_eq!(client.circuit("direct").consecutive_failures, 0);
}

#[tokio::test]
async fn test_default_provider_used_for_bare_endpoint() {
    let x = start_mock_backend(MockResponse::ok(r#"{"from":"default"}"#)).await;
    let config = ClientConfig {
        include_builtin_providers: false,
        default_provider: Some("x".to_string()),
        use_system_proxy: false,
        providers: vec![provider("x", &x.base_url(), 1)],
        ..ClientConfig::default()
    };
    let client = UpstreamClient::new(&config).unwrap();

    let payload = client.get("/ticker").await.unwrap();
    assert_eq!(payload["from"], "default");
    assert_eq!(x.hits(), 1);
}

#[tokio::test]
async fn test_cancelled_request_leaves_breaker_untouched() {
    let x = start_mock_backend(MockResponse::ok("{}").with_delay(Duration::from_secs(2))).await;
    let client = client_with(vec![provider("x", &x.base_url(), 3)]);

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        client.request(&UpstreamRequest::new("/slow").provider("x")),
    )
    .await;

    assert!(outcome.is_err(), "caller deadline should fire first");
    let circuit = client.circuit("x");
    assert_eq!(circuit.consecutive_failures, 0);
    assert!(circuit.since_last_success.is_none());
}

#[tokio::test]
async fn test_rate_limited_provider_spaces_requests() {
    let x = start_mock_backend(MockResponse::ok("{}")).await;
    let mut config = provider("x", &x.base_url(), 1);
    config.rate_limit_per_second = Some(10.0);
    let client = client_with(vec![config]);
    let request = UpstreamRequest::new("/ticker").provider("x");

    let started = std::time::Instant::now();
    for _ in 0..3 {
        client.request(&request).await.unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(x.hits(), 3);
}
