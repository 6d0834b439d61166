//! Provider lookup by account provider type.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::provider::MinerProvider;

/// Engines known to the host, keyed by the provider type they handle.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn MinerProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider`, replacing any engine for the same provider type.
    pub fn register(&mut self, provider: Arc<dyn MinerProvider>) -> Option<Arc<dyn MinerProvider>> {
        self.providers
            .insert(provider.provider_type().to_string(), provider)
    }

    pub fn get(&self, provider_type: &str) -> Option<Arc<dyn MinerProvider>> {
        self.providers.get(provider_type).cloned()
    }

    pub fn provider_types(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MinerProvider>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_types", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
