//! Ordered provider registry
//!
//! Index is precedence: the provider registered last overrides all others.
//! The order is fixed once the registry is built.

use std::sync::Arc;

use super::traits::PreferenceProvider;

/// Immutable, precedence-ordered list of preference providers
///
/// # Example
///
/// ```
/// use prefstack_core::providers::{MemoryPreferenceProvider, ProviderRegistry};
/// use prefstack_core::PreferenceScope;
/// use std::sync::Arc;
///
/// let registry = ProviderRegistry::builder()
///     .with_provider(Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User)))
///     .with_provider(Arc::new(MemoryPreferenceProvider::new(PreferenceScope::Workspace)))
///     .build();
///
/// assert_eq!(registry.scopes(), vec!["user", "workspace"]);
/// assert_eq!(registry.position("workspace"), Some(1));
/// ```
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<[Arc<dyn PreferenceProvider>]>,
}

impl ProviderRegistry {
    /// Create a registry from providers ordered lowest to highest precedence
    pub fn new(providers: Vec<Arc<dyn PreferenceProvider>>) -> Self {
        Self {
            providers: providers.into(),
        }
    }

    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider at a precedence index
    pub fn get(&self, index: usize) -> Option<&Arc<dyn PreferenceProvider>> {
        self.providers.get(index)
    }

    /// Providers from lowest to highest precedence
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn PreferenceProvider>> {
        self.providers.iter()
    }

    /// `(index, provider)` pairs from highest to lowest precedence
    pub fn iter_by_precedence(&self) -> impl Iterator<Item = (usize, &Arc<dyn PreferenceProvider>)> {
        self.providers.iter().enumerate().rev()
    }

    /// Scope names from lowest to highest precedence
    pub fn scopes(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.scope()).collect()
    }

    /// Precedence index of a scope
    pub fn position(&self, scope: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.scope() == scope)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("scopes", &self.scopes())
            .finish()
    }
}

/// Builder appending providers in increasing precedence
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: Vec<Arc<dyn PreferenceProvider>>,
}

impl ProviderRegistryBuilder {
    /// Append a provider that overrides every provider added before it
    pub fn with_provider<P>(mut self, provider: Arc<P>) -> Self
    where
        P: PreferenceProvider + 'static,
    {
        self.providers.push(provider);
        self
    }

    /// Append an already type-erased provider
    pub fn with_shared(mut self, provider: Arc<dyn PreferenceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry::new(self.providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryPreferenceProvider;
    use crate::types::PreferenceScope;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::builder()
            .with_provider(Arc::new(MemoryPreferenceProvider::new(PreferenceScope::User)))
            .with_provider(Arc::new(MemoryPreferenceProvider::new(PreferenceScope::Workspace)))
            .with_provider(Arc::new(MemoryPreferenceProvider::new(PreferenceScope::Named("folder".into()))))
            .build()
    }

    #[test]
    fn test_order_is_precedence() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.scopes(), vec!["user", "workspace", "folder"]);

        let by_precedence: Vec<_> = registry
            .iter_by_precedence()
            .map(|(i, p)| (i, p.scope().to_string()))
            .collect();
        assert_eq!(
            by_precedence,
            vec![(2, "folder".to_string()), (1, "workspace".to_string()), (0, "user".to_string())]
        );
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        assert_eq!(registry.position("user"), Some(0));
        assert_eq!(registry.position("remote"), None);
        assert_eq!(registry.get(1).map(|p| p.scope()), Some("workspace"));
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn test_clones_share_order() {
        let registry = registry();
        let clone = registry.clone();
        assert_eq!(registry.scopes(), clone.scopes());
        assert!(ProviderRegistry::new(Vec::new()).is_empty());
    }
}
