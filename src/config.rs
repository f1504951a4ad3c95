use failure::Fail;
use imprimatur_models::Config as ModelConfig;
use log::LevelFilter;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::Result;

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read(path).map_err(ReadConfigurationError)?;
    parse(&data)
}

fn parse(data: &[u8]) -> Result<Config> {
    toml::from_slice(data).map_err(|e| ConfigurationError(e).into())
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub mail: imprimatur_mail::Config,
    #[serde(default)]
    pub logging: Logging,
    #[serde(flatten)]
    pub model: ModelConfig,
}

impl Config {
    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), failure::Error> {
        self.mail.validate()?;
        self.model.validate()?;

        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            filters: HashMap::new(),
        }
    }
}
