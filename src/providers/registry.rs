//! Provider registry.
//!
//! # Responsibilities
//! - Catalogue of known providers keyed by unique name
//! - Upsert by name (last write wins, no error on duplicates)
//! - Resolve a full URL to the provider that owns it

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::ProviderConfig;
use crate::config::validation::ValidationError;
use crate::providers::defaults;
use crate::providers::provider::Provider;

/// Snapshot-read, copy-on-write catalogue of providers.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: ArcSwap<HashMap<String, Arc<Provider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self {
            providers: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Create a registry pre-populated with the built-in providers.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for config in defaults::builtin_providers() {
            if let Err(errors) = registry.register(config) {
                tracing::error!(?errors, "Built-in provider failed validation");
            }
        }
        registry
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<Provider>> {
        self.providers.load().get(name).cloned()
    }

    /// Validate and insert (or replace) a provider.
    pub fn register(&self, config: ProviderConfig) -> Result<(), Vec<ValidationError>> {
        let provider = Provider::from_config(&config)?;
        self.insert(provider);
        Ok(())
    }

    /// Insert an already-validated provider, replacing any with the same name.
    pub fn insert(&self, provider: Provider) {
        let name = provider.name.clone();
        let provider = Arc::new(provider);
        let previous = self.providers.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.clone(), provider.clone());
            next
        });

        if previous.contains_key(&name) {
            tracing::info!(provider = %name, base_url = %provider.base_url, "Provider replaced");
        } else {
            tracing::debug!(provider = %name, base_url = %provider.base_url, "Provider registered");
        }
    }

    /// Remove a provider. Returns the removed entry, if any.
    pub fn remove(&self, name: &str) -> Option<Arc<Provider>> {
        let previous = self.providers.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(name);
            next
        });
        previous.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered providers, sorted by name.
    pub fn all(&self) -> Vec<Arc<Provider>> {
        let mut all: Vec<Arc<Provider>> = self.providers.load().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Find the provider whose base URL prefixes `url`, returning it and the
    /// endpoint remainder. The longest matching base URL wins; providers
    /// sharing a base URL resolve to the smallest name.
    pub fn match_url<'a>(&self, url: &'a str) -> Option<(Arc<Provider>, &'a str)> {
        self.providers
            .load()
            .values()
            .filter_map(|p| p.endpoint_of(url).map(|endpoint| (p.clone(), endpoint)))
            .max_by(|(a, _), (b, _)| {
                a.base_url
                    .len()
                    .cmp(&b.base_url.len())
                    .then_with(|| b.name.cmp(&a.name))
            })
    }

    pub fn len(&self) -> usize {
        self.providers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
