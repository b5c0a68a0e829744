//! Application command handlers for mictest.
//!
//! # Commands
//! - `record`: Interactive microphone test (default)
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries
//! - `config`: Open configuration file in user's preferred editor

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod record;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
