//! Compiler settings and their loader

mod loader;
mod types;

pub use loader::SettingsLoader;
pub use types::{on_off, Boilerplate, CompilerSettings, HostsFileSettings, ProxySettings};
