//! # Engine Configuration
//!
//! Loaded once at startup. The caller supplies the TOML text; the engine
//! never touches the filesystem.
//!
//! ```toml
//! index_maps = "per_archetype"
//! initial_capacity = 4096
//! ```

use serde::Deserialize;

use crate::error::ConfigError;

/// How archetype storages are assigned index maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMapPolicy {
    /// Every storage shares one map.
    #[default]
    Shared,
    /// Each storage owns a map.
    PerArchetype,
}

/// Engine construction parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Index map assignment.
    pub index_maps: IndexMapPolicy,
    /// Rows reserved per storage up front. `0` reserves lazily.
    pub initial_capacity: usize,
}

impl EngineConfig {
    /// Parses a configuration document.
    ///
    /// Missing keys keep their default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid TOML or
    /// contains unknown keys or values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
