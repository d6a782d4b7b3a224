//! Preference providers
//!
//! A provider holds the raw values of one scope. Providers are layered by a
//! [`ProviderRegistry`]; the [`PreferenceResolver`](crate::resolver::PreferenceResolver)
//! computes effective values across them.
//!
//! Built-in scopes:
//! - `MemoryPreferenceProvider`: in-memory, also the test double
//! - `FilePreferenceProvider`: JSON settings file (user/workspace level)

mod traits;
mod error;
mod state;
mod memory;
mod file;
mod registry;

pub use traits::{PreferenceProvider, ChangeListener, ReadyListener};
pub use error::{PreferenceError, PreferenceResult};
pub use memory::MemoryPreferenceProvider;
pub use file::FilePreferenceProvider;
pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
