//! Failure taxonomy for upstream requests.
//!
//! Every failure path in the client ends in a [`RequestError`]. Callers branch
//! on [`ErrorKind`], never on the message text.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, DNS failure, reset.
    Network,
    /// No response within the provider timeout.
    Timeout,
    /// HTTP 429.
    RateLimit,
    /// HTTP 401 / 403.
    Auth,
    /// HTTP 404.
    NotFound,
    /// HTTP 5xx.
    Server,
    /// Body did not parse as JSON.
    InvalidResponse,
    /// Provider skipped because its circuit is open.
    CircuitOpen,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a failure of this kind is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        retryable(*self)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry eligibility as a pure function of the kind.
pub fn retryable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Network
            | ErrorKind::Timeout
            | ErrorKind::RateLimit
            | ErrorKind::Server
            | ErrorKind::CircuitOpen
    )
}

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A classified failure, carrying enough context to retry or report it.
#[derive(Debug, Serialize)]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
    pub provider: String,
    /// Full URL (or endpoint) the failure relates to.
    pub target: String,
    pub status_code: Option<u16>,
    #[serde(rename = "retry_after_secs", serialize_with = "serialize_secs")]
    pub retry_after: Option<Duration>,
    #[serde(skip)]
    pub cause: Option<Cause>,
}

fn serialize_secs<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.serialize_some(&d.as_secs()),
        None => s.serialize_none(),
    }
}

impl RequestError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        provider: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: provider.into(),
            target: target.into(),
            status_code: None,
            retry_after: None,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Synthesized when a provider is skipped without a network call.
    pub fn circuit_open(provider: &str, target: &str) -> Self {
        Self::new(ErrorKind::CircuitOpen, "Circuit breaker is open", provider, target)
    }

    /// Synthesized when no candidate provider was ever attempted.
    pub fn no_providers(target: &str) -> Self {
        Self::new(ErrorKind::Unknown, "No providers available", "none", target)
    }

    pub fn is_retryable(&self) -> bool {
        retryable(self.kind)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.kind.as_str().to_uppercase(),
            self.provider,
            self.message
        )?;
        if let Some(status) = self.status_code {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(retry_after) = self.retry_after {
            write!(f, " - retry after {}s", retry_after.as_secs())?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// What went wrong, as observed at the point of failure.
#[derive(Debug)]
pub enum FailureSignal {
    /// Connect, DNS or reset before a response arrived.
    Transport { detail: String },
    /// Elapsed time exceeded before any response.
    TimedOut,
    /// A response arrived with a non-success status.
    Status {
        code: u16,
        /// Raw `Retry-After` header value, if any.
        retry_after: Option<String>,
    },
    /// Response body failed to parse.
    MalformedBody { detail: String },
    /// Anything the categories above do not cover.
    Other { detail: String },
}

/// Map a failure signal to a [`RequestError`] for `provider` / `target`.
pub fn classify(signal: FailureSignal, provider: &str, target: &str) -> RequestError {
    match signal {
        FailureSignal::Transport { detail } => RequestError::new(
            ErrorKind::Network,
            format!("Connection failed: {}", detail),
            provider,
            target,
        ),
        FailureSignal::TimedOut => {
            RequestError::new(ErrorKind::Timeout, "Request timed out", provider, target)
        }
        FailureSignal::Status { code, retry_after } => classify_status(code, retry_after, provider, target),
        FailureSignal::MalformedBody { detail } => RequestError::new(
            ErrorKind::InvalidResponse,
            format!("Invalid JSON response: {}", detail),
            provider,
            target,
        ),
        FailureSignal::Other { detail } => {
            RequestError::new(ErrorKind::Unknown, detail, provider, target)
        }
    }
}

fn classify_status(
    code: u16,
    retry_after: Option<String>,
    provider: &str,
    target: &str,
) -> RequestError {
    let (kind, message) = match code {
        429 => (ErrorKind::RateLimit, "Rate limit exceeded".to_string()),
        401 | 403 => (ErrorKind::Auth, "Authentication failed".to_string()),
        404 => (ErrorKind::NotFound, "Resource not found".to_string()),
        500..=599 => (ErrorKind::Server, format!("Server error: {}", code)),
        _ => (ErrorKind::Unknown, format!("Unexpected status: {}", code)),
    };

    let error = RequestError::new(kind, message, provider, target).with_status(code);

    // Only integer seconds are honoured; HTTP-date values are ignored.
    match (kind, retry_after.as_deref().map(str::trim)) {
        (ErrorKind::RateLimit, Some(raw)) => match raw.parse::<u64>() {
            Ok(secs) => error.with_retry_after(Duration::from_secs(secs)),
            Err(_) => error,
        },
        _ => error,
    }
}
