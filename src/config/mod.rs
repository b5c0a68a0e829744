//! Configuration management for mictest.
//!
//! Settings are read from an optional TOML file in the user's config directory.

pub mod file;

pub use file::{config_path, MicTestConfig};
