//! Configuration module for the execution gateway
//!
//! Provider credentials, retry and timeout knobs and the language table are
//! read once at process start, from the environment and an optional YAML file,
//! and are immutable afterwards.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;
