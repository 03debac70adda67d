//! Configuration loading and access.

pub mod loader;
pub mod model;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::presets::PresetTable;
use crate::validation::SystemCapabilities;
pub use model::AppConfig;

/// Holds the validated configuration and the preset table built from it.
pub struct ConfigManager {
    config: AppConfig,
    presets: Arc<PresetTable>,
}

impl ConfigManager {
    /// Loads and validates the config file, then builds the preset table.
    pub fn new(config_path: &Path, capabilities: &SystemCapabilities) -> Result<Self> {
        let config = loader::load_and_validate(config_path, capabilities)?;
        let presets = PresetTable::from_config_or_builtin(&config.presets)?;

        tracing::info!(
            path = %config_path.display(),
            presets = presets.len(),
            watch_folders = config.watch_folders.len(),
            "Configuration loaded"
        );

        Ok(Self {
            config,
            presets: Arc::new(presets),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn presets(&self) -> Arc<PresetTable> {
        Arc::clone(&self.presets)
    }
}
