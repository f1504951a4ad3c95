use failure::Fail;
use serde::Deserialize;

use crate::fact_check::{Deployment, DeploymentError};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub deployment: DeploymentConfig,
    pub storage: Storage,
}

/// Identity of this deployment.
///
/// Either both `environment` and `domain` are given, or `publisher-host`
/// from which they are derived.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentConfig {
    #[serde(default)]
    pub environment: Option<String>,
    /// Domain at which fact-check replies are received.
    #[serde(default)]
    pub domain: Option<String>,
    /// Public host name of the publisher, `publisher.<environment>.<domain>`.
    #[serde(default)]
    pub publisher_host: Option<String>,
}

/// Edition storage configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    /// Path to the JSON file in which editions are kept.
    pub path: std::path::PathBuf,
}

impl Config {
    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), DeploymentConfigError> {
        self.deployment.deployment().map(|_| ())
    }
}

impl DeploymentConfig {
    pub fn deployment(&self) -> Result<Deployment, DeploymentConfigError> {
        match (&self.environment, &self.domain, &self.publisher_host) {
            (Some(environment), Some(domain), None) =>
                Ok(Deployment::new(environment.as_str(), domain.as_str())?),
            (None, None, Some(host)) =>
                Ok(Deployment::from_publisher_host(host)?),
            _ => Err(DeploymentConfigError::Ambiguous),
        }
    }
}

#[derive(Debug, Fail)]
pub enum DeploymentConfigError {
    #[fail(display = "Deployment must specify either environment and domain, \
        or publisher-host")]
    Ambiguous,
    #[fail(display = "{}", _0)]
    Invalid(#[cause] DeploymentError),
}

impl_from! { for DeploymentConfigError ;
    DeploymentError => |e| DeploymentConfigError::Invalid(e),
}
