use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigLoadError;
use crate::module::ManagerOptions;

/// Session file written when none exists yet
pub const EXAMPLE_CONFIG: &str = r#"# Skirmish session
name = "demo"
ticks_per_second = 20
debug_level = 0

# A module is a name, or a table mapping the name to the module's data
modules = [
  "Dummy",
  { Stages = [
      { name = "warmup", modules = [ { StageTimer = { duration = "5s" } } ] },
      { name = "match", modules = [ { StageTimer = { duration = "30s" } } ] },
  ] },
]
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    #[serde(default)]
    pub debug_level: u8,
    #[serde(default)]
    pub modules: Vec<toml::Value>,
}

fn default_name() -> String {
    "skirmish".to_string()
}

fn default_ticks_per_second() -> u32 {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            ticks_per_second: default_ticks_per_second(),
            debug_level: 0,
            modules: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config = Self::parse(&content)?;
        info!(target: "session", "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigLoadError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        if config.ticks_per_second == 0 {
            return Err(ConfigLoadError::ParseError(
                "ticks_per_second must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Write the example session to `path`. An existing file is never overwritten.
    pub fn write_example(path: &Path) -> Result<bool, ConfigLoadError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        }
        fs::write(path, EXAMPLE_CONFIG).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        info!(target: "session", "Wrote example config to {}", path.display());
        Ok(true)
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            ticks_per_second: self.ticks_per_second,
            debug_level: self.debug_level,
            parent_session: None,
        }
    }
}
