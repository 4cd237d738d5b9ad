//! Service configuration document loading

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::{CacheEngineConfig, ValidatedConfig};
use crate::error::{Error, Result};

/// Upper bound on configuration file size
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Implemented by any host configuration that embeds a cache section
pub trait CacheServiceConfiguration {
    /// The cache section of the document
    fn cache(&self) -> &CacheEngineConfig;
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Top-level service document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub cache: CacheEngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl CacheServiceConfiguration for CacheEngineConfig {
    fn cache(&self) -> &CacheEngineConfig {
        self
    }
}

impl CacheServiceConfiguration for ServiceConfig {
    fn cache(&self) -> &CacheEngineConfig {
        &self.cache
    }
}

impl ServiceConfig {
    /// Parse a YAML document without validating it
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file without validating it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(Error::Internal(format!(
                "configuration file {} is larger than {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, ValidatedConfig)> {
        let config = Self::from_file(path)?;
        let validated = config.cache.clone().into_validated()?;
        Ok((config, validated))
    }
}

// =============================================================================
// Tests
// =============================================================================
