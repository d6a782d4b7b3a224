//! Event plumbing shared by providers and the preference service

mod emitter;
mod subscription;

pub use emitter::{Emitter, Listener};
pub use subscription::Subscription;
