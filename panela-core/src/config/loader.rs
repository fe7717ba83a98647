//! Settings loader

use crate::config::CompilerSettings;
use crate::error::{Error, Result};
use std::path::Path;

/// Loads compiler settings from JSON or TOML files
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a file, picking the format by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CompilerSettings> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings file {}: {}", path.display(), e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext {
            "json" => Self::from_json(&content),
            "toml" => Self::from_toml(&content),
            _ => Err(Error::Config(format!("Unknown settings format: {}", ext))),
        }
    }

    /// Parse JSON settings
    pub fn from_json(content: &str) -> Result<CompilerSettings> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML settings
    pub fn from_toml(content: &str) -> Result<CompilerSettings> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}
