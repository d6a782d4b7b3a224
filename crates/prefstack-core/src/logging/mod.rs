//! Logging for hosts that bring their own output
//!
//! The crate never installs a global logger; every component takes a
//! [`SharedLogger`] at construction.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LogLevel, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{MemoryLogger, LogEntry};
