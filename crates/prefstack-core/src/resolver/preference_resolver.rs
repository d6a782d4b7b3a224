//! Effective value resolution across layered scopes
//!
//! Precedence strictly decides: the highest scope that defines a key wins,
//! whatever the value or the order in which scopes were written. Inside a
//! scope there is a single slot per key, so the last write wins there.

use std::collections::HashMap;

use crate::providers::{PreferenceResult, ProviderRegistry};
use crate::types::PreferenceValue;

/// An effective value together with the scope that supplied it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreference {
    pub value: PreferenceValue,
    /// Scope that defines the winning value
    pub scope: String,
    /// Precedence index of that scope
    pub precedence: usize,
}

/// Raw value of a key in one scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedValue {
    pub scope: String,
    pub value: Option<PreferenceValue>,
}

/// Per-scope view of a key
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceInspection {
    pub key: String,
    /// Raw values from lowest to highest precedence
    pub values: Vec<ScopedValue>,
    pub effective: Option<ResolvedPreference>,
}

impl PreferenceInspection {
    /// Raw value in a given scope
    pub fn value_in(&self, scope: &str) -> Option<&PreferenceValue> {
        self.values
            .iter()
            .find(|v| v.scope == scope)
            .and_then(|v| v.value.as_ref())
    }
}

/// Resolution engine over an ordered provider registry
#[derive(Debug, Clone)]
pub struct PreferenceResolver {
    providers: ProviderRegistry,
}

impl PreferenceResolver {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Resolve the effective value of a key
    ///
    /// `Ok(None)` means no scope defines the key, which is distinct from a
    /// scope defining it as `null`.
    pub fn resolve(&self, key: &str) -> PreferenceResult<Option<ResolvedPreference>> {
        self.scan(key, None)
    }

    /// Resolve as if the provider at `index` held `raw` for `key`
    ///
    /// Lets a change be evaluated against the exact raw value it carries,
    /// independent of later mutations of that provider.
    pub fn resolve_overriding(
        &self,
        key: &str,
        index: usize,
        raw: Option<&PreferenceValue>,
    ) -> PreferenceResult<Option<ResolvedPreference>> {
        self.scan(key, Some((index, raw)))
    }

    fn scan(
        &self,
        key: &str,
        overridden: Option<(usize, Option<&PreferenceValue>)>,
    ) -> PreferenceResult<Option<ResolvedPreference>> {
        for (index, provider) in self.providers.iter_by_precedence() {
            let raw = match overridden {
                Some((at, raw)) if at == index => raw.cloned(),
                _ => provider.get_preference(key)?,
            };
            if let Some(value) = raw {
                return Ok(Some(ResolvedPreference {
                    value,
                    scope: provider.scope().to_string(),
                    precedence: index,
                }));
            }
        }
        Ok(None)
    }

    /// Build the full effective mapping
    ///
    /// Applies scopes from lowest to highest precedence, each overwriting the
    /// keys it defines.
    pub fn resolve_all(&self) -> HashMap<String, PreferenceValue> {
        let mut effective = HashMap::new();
        for provider in self.providers.iter() {
            effective.extend(provider.get_preferences());
        }
        effective
    }

    /// Raw values of a key in every scope plus its effective value
    pub fn inspect(&self, key: &str) -> PreferenceResult<PreferenceInspection> {
        let mut values = Vec::with_capacity(self.providers.len());
        for provider in self.providers.iter() {
            values.push(ScopedValue {
                scope: provider.scope().to_string(),
                value: provider.get_preference(key)?,
            });
        }
        Ok(PreferenceInspection {
            key: key.to_string(),
            values,
            effective: self.resolve(key)?,
        })
    }
}
