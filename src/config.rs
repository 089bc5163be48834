use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::{error::TreeError, properties::NodeId};

/// Tunables for a [crate::view::TreeView].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Upper bound on concurrently running child fetches during a recursive expand.
    pub max_concurrent_fetches: usize,
    /// When false, checkbox commands are rejected.
    pub checkboxes: bool,
    /// When a checked node's children arrive, check them too.
    pub cascade_on_load: bool,
    /// Checked set installed once the top-level nodes are loaded.
    pub initial_checked: Vec<NodeId>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_concurrent_fetches: 8,
            checkboxes: true,
            cascade_on_load: true,
            initial_checked: Vec::new(),
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.max_concurrent_fetches == 0 {
            return Err(TreeError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait TreeConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<TreeConfig, TreeError>;
    fn set_config(&self, config: &TreeConfig) -> Result<(), TreeError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl TreeConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<TreeConfig, TreeError> {
        tracing::debug!("Attempting to read tree config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(TreeConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: TreeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn set_config(&self, config: &TreeConfig) -> Result<(), TreeError> {
        tracing::debug!("Attempting to write tree config to: {:?}", &self.path);
        config.validate()?;
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
