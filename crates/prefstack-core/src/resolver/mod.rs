//! Preference resolution across scopes
//!
//! This module turns raw per-scope values into the effective values that
//! consumers see.

mod preference_resolver;

pub use preference_resolver::{
    PreferenceResolver, ResolvedPreference, PreferenceInspection, ScopedValue,
};
