//! glbmin.toml configuration
//!
//! ```toml
//! [extensions]
//! # Extensions decoded into typed shapes; everything else passes through opaque.
//! # Omit the list to enable every known extension.
//! enabled = ["KHR_lights_punctual", "KHR_materials_unlit"]
//! ```

use anyhow::{Context, Result};
use glbmin_core::ExtensionRegistry;
use serde::Deserialize;
use std::path::Path;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG: &str = "glbmin.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub extensions: ExtensionsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionsSection {
    /// Extension names to decode; `None` enables all known extensions
    pub enabled: Option<Vec<String>>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load an explicit config file, else `glbmin.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG);
        if fallback.is_file() {
            tracing::debug!(path = DEFAULT_CONFIG, "using config from working directory");
            Self::load(fallback)
        } else {
            Ok(Self::default())
        }
    }

    /// Build the extension registry. Unknown names are an error.
    pub fn registry(&self) -> Result<ExtensionRegistry> {
        match &self.extensions.enabled {
            None => Ok(ExtensionRegistry::khronos()),
            Some(names) => ExtensionRegistry::from_names(names)
                .context("Invalid [extensions] enabled list"),
        }
    }
}
