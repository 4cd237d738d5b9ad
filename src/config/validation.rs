//! Configuration validation rules
//!
//! Each rule is evaluated independently so a single pass reports every
//! violation, not just the first.

use thiserror::Error;

use super::{CacheEngineConfig, CacheTopologyType};

/// A failed configuration rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Clustering fields missing, or persistence enabled without a location
    #[error("invalid topology configuration: {0}")]
    InvalidTopologyConfig(String),

    /// Clustered topology without an auth configuration
    #[error("invalid auth configuration: {0}")]
    InvalidAuthConfig(String),

    /// Clustered topology without an encrypt configuration
    #[error("invalid encrypt configuration: {0}")]
    InvalidEncryptConfig(String),
}

impl Violation {
    /// Name of the rule that failed
    pub fn rule(&self) -> &'static str {
        match self {
            Violation::InvalidTopologyConfig(_) => "InvalidTopologyConfig",
            Violation::InvalidAuthConfig(_) => "InvalidAuthConfig",
            Violation::InvalidEncryptConfig(_) => "InvalidEncryptConfig",
        }
    }
}

/// Run every rule against a configuration
pub fn validate(config: &CacheEngineConfig) -> Vec<Violation> {
    [
        check_topology(config),
        check_auth(config),
        check_encrypt(config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Clustering fields for the clustered family, plus the persistence location
/// for every topology. Reports at most one violation.
pub fn check_topology(config: &CacheEngineConfig) -> Option<Violation> {
    let mut problems = Vec::new();

    if config.topology.is_clustered_family() {
        let required = [
            ("clusterName", &config.cluster_name),
            ("bindAddress", &config.bind_address),
            ("initialHosts", &config.initial_hosts),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| !is_present(value))
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            problems.push(format!(
                "{} must be set for a {} topology",
                missing.join(", "),
                config.topology
            ));
        }
    }

    if config.persistence_enabled() && !is_present(&config.persistence_file_location) {
        problems.push(
            "persistenceFileLocation must be set when persistenceToFileEnabled is true".to_string(),
        );
    }

    if problems.is_empty() {
        None
    } else {
        Some(Violation::InvalidTopologyConfig(problems.join("; ")))
    }
}

/// A clustered topology needs auth material
pub fn check_auth(config: &CacheEngineConfig) -> Option<Violation> {
    if config.topology == CacheTopologyType::Clustered && config.auth_configuration.is_none() {
        return Some(Violation::InvalidAuthConfig(
            "authConfiguration is required for a clustered topology".to_string(),
        ));
    }
    None
}

/// A clustered topology needs encryption material
pub fn check_encrypt(config: &CacheEngineConfig) -> Option<Violation> {
    if config.topology == CacheTopologyType::Clustered && config.encrypt_configuration.is_none() {
        return Some(Violation::InvalidEncryptConfig(
            "encryptConfiguration is required for a clustered topology".to_string(),
        ));
    }
    None
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{auth, encrypt};
    use assert_matches::assert_matches;

    fn clustered() -> CacheEngineConfig {
        CacheEngineConfig::new(CacheTopologyType::Clustered)
            .with_cluster_name("sessions")
            .with_bind_address("10.0.0.1")
            .with_initial_hosts("10.0.0.2[7800],10.0.0.3[7800]")
            .with_auth(auth())
            .with_encrypt(encrypt())
    }

    #[test]
    fn test_valid_clustered_config() {
        assert!(validate(&clustered()).is_empty());
    }

    #[test]
    fn test_standalone_needs_nothing() {
        let config = CacheEngineConfig::new(CacheTopologyType::Standalone);
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn test_missing_cluster_fields_report_one_violation() {
        for topology in [CacheTopologyType::Clustered, CacheTopologyType::Insecure] {
            let mut config = clustered();
            config.topology = topology;
            config.cluster_name = None;
            config.bind_address = Some(String::new());
            config.initial_hosts = None;

            let violations = validate(&config);
            assert_eq!(violations.len(), 1, "{:?}", violations);
            assert_matches!(&violations[0], Violation::InvalidTopologyConfig(reason) => {
                assert!(reason.contains("clusterName"));
                assert!(reason.contains("bindAddress"));
                assert!(reason.contains("initialHosts"));
            });
        }
    }

    #[test]
    fn test_missing_auth_and_encrypt_are_independent() {
        let mut config = clustered();
        config.auth_configuration = None;
        assert_eq!(validate(&config), vec![check_auth(&config).unwrap()]);

        let mut config = clustered();
        config.encrypt_configuration = None;
        let violations = validate(&config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule(), "InvalidEncryptConfig");

        let mut config = clustered();
        config.auth_configuration = None;
        config.encrypt_configuration = None;
        let rules: Vec<_> = validate(&config).iter().map(Violation::rule).collect();
        assert_eq!(rules, vec!["InvalidAuthConfig", "InvalidEncryptConfig"]);
    }

    #[test]
    fn test_insecure_ignores_security_material() {
        let mut config = clustered();
        config.topology = CacheTopologyType::Insecure;
        config.auth_configuration = None;
        config.encrypt_configuration = None;
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn test_persistence_without_location() {
        let config = CacheEngineConfig::new(CacheTopologyType::Standalone)
            .with_persistence_enabled(true);
        let violations = validate(&config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule(), "InvalidTopologyConfig");

        let config = config.with_persistence_location("");
        assert_eq!(validate(&config).len(), 1);

        let config = config.with_persistence_location("/var/lib/cache");
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn test_persistence_disabled_ignores_location() {
        let config = CacheEngineConfig::new(CacheTopologyType::Standalone)
            .with_persistence_enabled(false);
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn test_violation_display() {
        let violation = Violation::InvalidAuthConfig("missing".to_string());
        assert_eq!(violation.to_string(), "invalid auth configuration: missing");
    }
}
