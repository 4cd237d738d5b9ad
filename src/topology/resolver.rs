//! Topology Resolver
//!
//! Maps a validated configuration onto an [`EngineDescriptor`]. The topology
//! row decides clustering and the transport profile; persistence is an
//! orthogonal column, so the six combinations share one construction path.

use std::path::PathBuf;

use super::{
    keys, CacheDescriptor, CacheMode, ClusteringDescriptor, EngineDescriptor, Expiration,
    TransportDescriptor, TransportProfile, TransportProperties,
};
use crate::config::{CacheTopologyType, ValidatedConfig};

/// One row of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TopologyRow {
    /// `None` means the engine runs without clustering
    transport: Option<TransportProfile>,
}

const fn row(topology: CacheTopologyType) -> TopologyRow {
    match topology {
        CacheTopologyType::Standalone => TopologyRow { transport: None },
        CacheTopologyType::Insecure => TopologyRow {
            transport: Some(TransportProfile::Insecure),
        },
        CacheTopologyType::Clustered => TopologyRow {
            transport: Some(TransportProfile::Secure),
        },
    }
}

/// Build the engine descriptor for a validated configuration
pub fn resolve(config: &ValidatedConfig) -> EngineDescriptor {
    let row = row(config.topology);

    let cache = CacheDescriptor {
        expiration: Expiration::from_config(config.expiration),
        statistics_enabled: true,
        persistence: persistence_location(config),
        clustering: row.transport.map(|_| clustering(config)),
    };

    EngineDescriptor {
        topology: config.topology,
        transport: row.transport.map(|profile| transport(config, profile)),
        cache,
    }
}

fn persistence_location(config: &ValidatedConfig) -> Option<PathBuf> {
    if !config.persistence_enabled() {
        return None;
    }
    config.persistence_file_location.as_deref().map(PathBuf::from)
}

fn clustering(config: &ValidatedConfig) -> ClusteringDescriptor {
    ClusteringDescriptor {
        mode: CacheMode::ReplicatedSync,
        await_initial_transfer: config.await_initial_transfer,
        fetch_in_memory_state: config.fetch_in_memory_state,
        state_transfer_timeout: config.state_transfer_timeout(),
    }
}

fn transport(config: &ValidatedConfig, profile: TransportProfile) -> TransportDescriptor {
    let mut properties = TransportProperties::new();
    properties.set(keys::TCP_ADDRESS, config.bind_address_or_placeholder());
    properties.set(keys::TCP_PORT, config.port.to_string());
    properties.set(keys::INITIAL_HOSTS, config.initial_hosts_or_placeholder());

    if profile == TransportProfile::Secure {
        if let Some(encrypt) = &config.encrypt_configuration {
            properties.set(keys::ENCRYPT_KEY_STORE_NAME, encrypt.key_store_name.as_str());
            properties.set(keys::ENCRYPT_STORE_PASSWORD, encrypt.key_store_password.as_str());
            properties.set(keys::ENCRYPT_ALIAS, encrypt.encryption_key_alias.as_str());
        }
        if let Some(auth) = &config.auth_configuration {
            properties.set(keys::AUTH_VALUE, auth.auth_value.as_str());
            properties.set(keys::AUTH_KEYSTORE_PATH, auth.key_store_path.as_str());
            properties.set(keys::AUTH_KEYSTORE_PASSWORD, auth.key_store_password.as_str());
            properties.set(keys::AUTH_KEYSTORE_TYPE, auth.key_store_type.as_str());
            properties.set(keys::AUTH_CERT_ALIAS, auth.cert_alias.as_str());
            properties.set(keys::AUTH_CIPHER_TYPE, auth.cipher_type.as_str());
        }
    }

    TransportDescriptor {
        cluster_name: config.cluster_name_or_placeholder().to_string(),
        profile,
        properties,
    }
}

// =============================================================================
// Tests
// =============================================================================
