//! Core types shared by providers, the resolver and the service
//!
//! This module contains the value, scope and change-record types.

mod scope;
mod change;
mod ready;

pub use scope::PreferenceScope;
pub use change::{RawChange, ChangeBatch, PreferenceChange};
pub use ready::ReadySignal;

/// A raw or effective preference value
///
/// `Value::Null` is a defined value; an undefined key is represented by
/// `Option::None` at the API surface.
pub type PreferenceValue = serde_json::Value;
