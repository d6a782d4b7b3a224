//! Preference service configuration
//!
//! Options are plain data and can be read from a YAML file:
//! - `ServiceConfig`: service options
//! - `PendingEventPolicy`: change delivery before readiness

mod error;
mod options;

pub use error::{ConfigError, ConfigResult};
pub use options::{ServiceConfig, PendingEventPolicy};
