//! Evaluation settings, loaded from a TOML file.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::CompositorError;
use crate::utilities::DEFAULT_LOCAL_SIZE;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CompositorConfig {
    /// Local work-group size the compute shaders are compiled with.
    pub local_size: [u32; 2],
    /// Allocate 16-bit float textures instead of 32-bit ones.
    pub half_precision: bool,
    /// Free pooled textures that went unused during the previous evaluation
    /// before starting a new one.
    pub reset_texture_pool: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            local_size: DEFAULT_LOCAL_SIZE,
            half_precision: true,
            reset_texture_pool: true,
        }
    }
}

impl CompositorConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CompositorError> {
        let config: CompositorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, CompositorError> {
        toml::to_string_pretty(self).map_err(|e| CompositorError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CompositorError> {
        if self.local_size.contains(&0) {
            return Err(CompositorError::config(format!(
                "local_size must be positive in both dimensions, got {:?}",
                self.local_size
            )));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<CompositorConfig, CompositorError> {
    let toml_str = fs::read_to_string(path)?;
    let config = CompositorConfig::from_toml_str(&toml_str)?;
    info!("Loaded compositor config from {}", path.display());
    Ok(config)
}
