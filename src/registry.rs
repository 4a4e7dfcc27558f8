//! Build-once lookup table from [`Provider`] to its [`Adapter`].

use std::collections::HashMap;

use crate::provider::Adapter;
use crate::types::Provider;

/// Read-only mapping built at startup and shared behind an `Arc`.
///
/// The key is the identifier callers dispatch on. It usually matches the adapter's own
/// provider, but an adapter may be registered under another key (for example an
/// OpenAI-compatible gateway), in which case responses carry the key.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Adapter>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn resolve(&self, provider: Provider) -> Option<&Adapter> {
        self.adapters.get(&provider)
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Registered identifiers in declaration order of [`Provider::ALL`].
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.adapters.contains_key(provider))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Collects adapters before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    adapters: HashMap<Provider, Adapter>,
}

impl RegistryBuilder {
    /// Registers `adapter` under `provider`, replacing any earlier registration.
    pub fn register(mut self, provider: Provider, adapter: impl Into<Adapter>) -> Self {
        self.adapters.insert(provider, adapter.into());
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            adapters: self.adapters,
        }
    }
}
