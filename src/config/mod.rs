//! Cache Engine Configuration
//!
//! Typed representation of the cache topology and its security
//! sub-configurations, as read from the service's YAML document.
//!
//! ```yaml
//! cache:
//!   type: clustered
//!   clusterName: sessions
//!   bindAddress: 10.0.0.1
//!   port: 7800
//!   initialHosts: 10.0.0.2[7800],10.0.0.3[7800]
//!   expiration: 1d
//!   authConfiguration: { ... }
//!   encryptConfiguration: { ... }
//! ```
//!
//! A configuration is validated once at load time (see [`validation`]) and is
//! immutable afterwards. Only a [`ValidatedConfig`] can be handed to the
//! topology resolver.

mod duration;
mod loader;
mod validation;

use std::fmt;
use std::ops::Deref;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use duration::parse_duration;
pub use loader::{CacheServiceConfiguration, ServerConfig, ServiceConfig};
pub use validation::{check_auth, check_encrypt, check_topology, validate, Violation};

/// Default transport port
pub const DEFAULT_PORT: u16 = 7800;

/// Default state-transfer timeout in seconds
pub const DEFAULT_STATE_TRANSFER_TIMEOUT_SECS: u64 = 5;

const NO_BIND_ADDRESS: &str = "[no bind address provided]";
const NO_INITIAL_HOSTS: &str = "[no hosts provided]";
const NO_CLUSTER_NAME: &str = "[no cluster name provided]";

// =============================================================================
// Topology
// =============================================================================

/// Clustering mode of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTopologyType {
    /// Single node, no clustering
    Standalone,
    /// Clustered without authentication or encryption
    Insecure,
    /// Clustered with authentication and encryption
    Clustered,
}

impl CacheTopologyType {
    /// All topologies, in declaration order
    pub const ALL: [CacheTopologyType; 3] = [
        CacheTopologyType::Standalone,
        CacheTopologyType::Insecure,
        CacheTopologyType::Clustered,
    ];

    /// True for the topologies that join a cluster
    pub fn is_clustered_family(self) -> bool {
        matches!(self, CacheTopologyType::Insecure | CacheTopologyType::Clustered)
    }
}

impl fmt::Display for CacheTopologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTopologyType::Standalone => write!(f, "standalone"),
            CacheTopologyType::Insecure => write!(f, "insecure"),
            CacheTopologyType::Clustered => write!(f, "clustered"),
        }
    }
}

// =============================================================================
// Security sub-configurations
// =============================================================================

/// Transport authentication material
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthConfig {
    /// Shared secret presented by every member
    pub auth_value: String,
    pub key_store_path: String,
    pub key_store_password: String,
    pub key_store_type: String,
    pub cert_alias: String,
    pub cipher_type: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_value", &"<redacted>")
            .field("key_store_path", &self.key_store_path)
            .field("key_store_password", &"<redacted>")
            .field("key_store_type", &self.key_store_type)
            .field("cert_alias", &self.cert_alias)
            .field("cipher_type", &self.cipher_type)
            .finish()
    }
}

/// Transport encryption material
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptConfig {
    pub key_store_name: String,
    pub key_store_password: String,
    pub encryption_key_alias: String,
}

impl fmt::Debug for EncryptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptConfig")
            .field("key_store_name", &self.key_store_name)
            .field("key_store_password", &"<redacted>")
            .field("encryption_key_alias", &self.encryption_key_alias)
            .finish()
    }
}

// =============================================================================
// CacheEngineConfig
// =============================================================================

/// Configuration for the embedded cache engine
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEngineConfig {
    /// Address the transport binds to
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Transport port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated peer list used for discovery
    #[serde(default)]
    pub initial_hosts: Option<String>,

    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(rename = "type")]
    pub topology: CacheTopologyType,

    /// Entry lifespan. Absent means entries never expire.
    #[serde(default, deserialize_with = "duration::deserialize_optional")]
    pub expiration: Option<Duration>,

    #[serde(default)]
    pub auth_configuration: Option<AuthConfig>,

    #[serde(default)]
    pub encrypt_configuration: Option<EncryptConfig>,

    /// Unset is treated as disabled
    #[serde(default)]
    pub persistence_to_file_enabled: Option<bool>,

    #[serde(default)]
    pub persistence_file_location: Option<String>,

    #[serde(default = "default_true")]
    pub fetch_in_memory_state: bool,

    #[serde(default = "default_true")]
    pub await_initial_transfer: bool,

    /// State-transfer timeout in seconds
    #[serde(default = "default_state_transfer_timeout")]
    pub state_transfer_timeout: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_state_transfer_timeout() -> u64 {
    DEFAULT_STATE_TRANSFER_TIMEOUT_SECS
}

impl CacheEngineConfig {
    /// Create a configuration for a topology with every other field defaulted
    pub fn new(topology: CacheTopologyType) -> Self {
        Self {
            bind_address: None,
            port: DEFAULT_PORT,
            initial_hosts: None,
            cluster_name: None,
            topology,
            expiration: None,
            auth_configuration: None,
            encrypt_configuration: None,
            persistence_to_file_enabled: None,
            persistence_file_location: None,
            fetch_in_memory_state: true,
            await_initial_transfer: true,
            state_transfer_timeout: DEFAULT_STATE_TRANSFER_TIMEOUT_SECS,
        }
    }

    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = Some(address.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_initial_hosts(mut self, hosts: impl Into<String>) -> Self {
        self.initial_hosts = Some(hosts.into());
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth_configuration = Some(auth);
        self
    }

    pub fn with_encrypt(mut self, encrypt: EncryptConfig) -> Self {
        self.encrypt_configuration = Some(encrypt);
        self
    }

    pub fn with_persistence_enabled(mut self, enabled: bool) -> Self {
        self.persistence_to_file_enabled = Some(enabled);
        self
    }

    pub fn with_persistence_location(mut self, location: impl Into<String>) -> Self {
        self.persistence_file_location = Some(location.into());
        self
    }

    /// Persistence is on only when explicitly enabled
    pub fn persistence_enabled(&self) -> bool {
        self.persistence_to_file_enabled == Some(true)
    }

    /// State-transfer timeout as a [`Duration`]
    pub fn state_transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.state_transfer_timeout)
    }

    pub fn bind_address_or_placeholder(&self) -> &str {
        self.bind_address.as_deref().unwrap_or(NO_BIND_ADDRESS)
    }

    pub fn initial_hosts_or_placeholder(&self) -> &str {
        self.initial_hosts.as_deref().unwrap_or(NO_INITIAL_HOSTS)
    }

    pub fn cluster_name_or_placeholder(&self) -> &str {
        self.cluster_name.as_deref().unwrap_or(NO_CLUSTER_NAME)
    }

    /// Run every validation rule
    pub fn validate(&self) -> Vec<Violation> {
        validation::validate(self)
    }

    /// Validate and seal the configuration
    pub fn into_validated(self) -> Result<ValidatedConfig> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(ValidatedConfig(self))
        } else {
            Err(Error::InvalidConfiguration(violations))
        }
    }
}

/// A configuration that passed every validation rule
#[derive(Debug, Clone)]
pub struct ValidatedConfig(CacheEngineConfig);

impl ValidatedConfig {
    /// Give back the underlying configuration
    pub fn into_inner(self) -> CacheEngineConfig {
        self.0
    }
}

impl Deref for ValidatedConfig {
    type Target = CacheEngineConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<CacheEngineConfig> for ValidatedConfig {
    type Error = Error;

    fn try_from(config: CacheEngineConfig) -> Result<Self> {
        config.into_validated()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn auth() -> AuthConfig {
        AuthConfig {
            auth_value: "shared-secret".to_string(),
            key_store_path: "/etc/cache/auth.jks".to_string(),
            key_store_password: "changeit".to_string(),
            key_store_type: "JKS".to_string(),
            cert_alias: "member".to_string(),
            cipher_type: "RSA".to_string(),
        }
    }

    pub fn encrypt() -> EncryptConfig {
        EncryptConfig {
            key_store_name: "/etc/cache/encrypt.jceks".to_string(),
            key_store_password: "changeit".to_string(),
            encryption_key_alias: "transport".to_string(),
        }
    }

    pub fn clustered() -> CacheEngineConfig {
        CacheEngineConfig::new(CacheTopologyType::Clustered)
            .with_cluster_name("sessions")
            .with_bind_address("10.0.0.1")
            .with_initial_hosts("h1,h2,h3")
            .with_auth(auth())
            .with_encrypt(encrypt())
    }

    pub fn insecure() -> CacheEngineConfig {
        CacheEngineConfig::new(CacheTopologyType::Insecure)
            .with_cluster_name("sessions")
            .with_bind_address("10.0.0.1")
            .with_initial_hosts("h1,h2")
    }
}

#[cfg(test)]
mod proptest;

// =============================================================================
// Tests
// =============================================================================
