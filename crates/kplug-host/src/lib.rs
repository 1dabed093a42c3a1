//! Wasmtime-based runner for kplug guest plugins.
//!
//! Loads a plugin module, feeds request bytes through the guest's
//! `allocate` export, invokes an entry point and reads back the buffer the
//! returned packed word describes.

pub mod config;
pub mod manager;
pub mod memory;
pub mod wasm_host;

pub use config::{EntryConfig, HostConfig, LimitsConfig, LoggingConfig, PluginConfig};
pub use manager::PluginManager;
pub use wasm_host::{HostState, WasmHost};
