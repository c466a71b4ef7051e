//! CLI configuration

use std::path::{Path, PathBuf};

use fanctl_engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Backend state file loaded into the in-memory backend
    pub state_file: Option<PathBuf>,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Ok(CliConfig::default())
        }
    }

    fn from_file(path: &Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))
    }

    /// State file from the command line, falling back to the config file
    pub fn resolve_state_file(&self, cli: Option<PathBuf>) -> CliResult<PathBuf> {
        cli.or_else(|| self.state_file.clone()).ok_or_else(|| {
            CliError::Config("no state file; pass --state or set state_file".into())
        })
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("fanctl").join("config.toml"))
    }
}
