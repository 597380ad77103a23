//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use upstream_client::{ClientConfig, ProviderConfig, UpstreamClient};

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Handle to a running mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads (request line + headers), lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock upstream that always returns the same response.
pub async fn start_mock_backend(response: MockResponse) -> MockUpstream {
    start_programmable_backend(move |_| {
        let response = response.clone();
        async move { response }
    })
    .await
}

/// Start a programmable mock upstream. The closure receives the zero-based
/// index of the request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockUpstream
where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let upstream = MockUpstream {
        addr,
        hits: hits.clone(),
        requests: requests.clone(),
    };

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            let hits = hits.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let Some(head) = read_head(&mut socket).await else {
                    return;
                };
                requests.lock().unwrap().push(head.to_lowercase());
                let index = hits.fetch_add(1, Ordering::SeqCst);

                let response = f(index).await;
                if !response.delay.is_zero() {
                    tokio::time::sleep(response.delay).await;
                }

                let mut raw = format!(
                    "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    response.status,
                    response.body.len()
                );
                for (name, value) in &response.headers {
                    raw.push_str(&format!("{}: {}\r\n", name, value));
                }
                raw.push_str("\r\n");
                raw.push_str(&response.body);

                let _ = socket.write_all(raw.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    upstream
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf[..end]).into_owned());
        }
    }
}

/// A URL on a local port with nothing listening.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Provider with fast test-friendly backoff and no jitter.
pub fn provider(name: &str, base_url: &str, max_retries: u32) -> ProviderConfig {
    let mut config = ProviderConfig::new(name, base_url);
    config.max_retries = max_retries;
    config.timeout_ms = 2_000;
    config.backoff_base_ms = 10;
    config.backoff_cap_ms = 50;
    config.jitter = 0.0;
    config
}

/// Client with only the given providers registered.
pub fn client_with(providers: Vec<ProviderConfig>) -> UpstreamClient {
    let config = ClientConfig {
        include_builtin_providers: false,
        default_provider: None,
        use_system_proxy: false,
        providers,
        ..ClientConfig::default()
    };
    UpstreamClient::new(&config).unwrap()
}
