//! Caller-facing request description.

/// What to fetch and which providers may serve it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Endpoint path (e.g. "/public/ticker") or a full URL.
    pub target: String,
    /// Query parameters, sent in order.
    pub params: Vec<(String, String)>,
    /// Primary provider. Ignored when `target` is a URL owned by a provider.
    pub provider: Option<String>,
    /// Providers tried, in order, after the primary.
    pub fallbacks: Vec<String>,
}

impl UpstreamRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    pub fn fallback(mut self, name: impl Into<String>) -> Self {
        self.fallbacks.push(name.into());
        self
    }

    pub fn fallbacks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether `target` is an absolute http(s) URL rather than an endpoint path.
    pub fn is_full_url(&self) -> bool {
        self.target.starts_with("http://") || self.target.starts_with("https://")
    }
}
