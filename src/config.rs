//! Run configuration loaded from TOML

use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamics::{SimConfig, TruckParams};
use crate::gnc::StanleyParams;
use crate::path::RandomPathParams;

/// An error that occurs during loading of a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot load the config file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the config file: {0}")]
    DeserialiseError(toml::de::Error),
}

/// Everything a command line run can be configured with. Every section is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sim: SimConfig,
    pub params: TruckParams,
    pub controller: StanleyParams,
    pub random_path: RandomPathParams,
}

impl RunConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::DeserialiseError)
    }
}

/// Load a run configuration file
pub fn load<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let config_str = read_to_string(path).map_err(ConfigError::FileLoadError)?;
    RunConfig::from_toml(&config_str)
}
