//! Property-Based Tests for Configuration Validation
//!
//! # Test Properties
//!
//! 1. **Clustering fields**: any missing field yields exactly one topology violation
//! 2. **Persistence**: enabled without a location always fails, for every topology
//! 3. **Standalone**: never needs clustering or security material
//! 4. **Idempotence**: validating twice gives the same answer

#![cfg(test)]

use proptest::prelude::*;

use super::test_support::{auth, encrypt};
use super::{CacheEngineConfig, CacheTopologyType, Violation};

// =============================================================================
// Property Strategies
// =============================================================================

fn topology_strategy() -> impl Strategy<Value = CacheTopologyType> {
    prop::sample::select(CacheTopologyType::ALL.to_vec())
}

fn clustered_family_strategy() -> impl Strategy<Value = CacheTopologyType> {
    prop::sample::select(vec![CacheTopologyType::Insecure, CacheTopologyType::Clustered])
}

/// A field value that is either absent, empty, or a real value
fn field_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-z0-9.,\\[\\]]{1,24}".prop_map(Some),
    ]
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

fn topology_violations(violations: &[Violation]) -> usize {
    violations
        .iter()
        .filter(|v| matches!(v, Violation::InvalidTopologyConfig(_)))
        .count()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_missing_cluster_field_is_one_violation(
        topology in clustered_family_strategy(),
        cluster_name in field_strategy(),
        bind_address in field_strategy(),
        initial_hosts in field_strategy(),
    ) {
        let mut config = CacheEngineConfig::new(topology)
            .with_auth(auth())
            .with_encrypt(encrypt());
        config.cluster_name = cluster_name;
        config.bind_address = bind_address;
        config.initial_hosts = initial_hosts;

        let all_present = present(&config.cluster_name)
            && present(&config.bind_address)
            && present(&config.initial_hosts);
        let violations = config.validate();

        if all_present {
            prop_assert!(violations.is_empty());
        } else {
            prop_assert_eq!(violations.len(), 1);
            prop_assert_eq!(topology_violations(&violations), 1);
        }
    }

    #[test]
    fn prop_persistence_needs_location(
        topology in topology_strategy(),
        location in prop_oneof![Just(None), Just(Some(String::new()))],
    ) {
        let mut config = CacheEngineConfig::new(topology)
            .with_cluster_name("c")
            .with_bind_address("b")
            .with_initial_hosts("h")
            .with_auth(auth())
            .with_encrypt(encrypt())
            .with_persistence_enabled(true);
        config.persistence_file_location = location;

        prop_assert_eq!(topology_violations(&config.validate()), 1);
    }

    #[test]
    fn prop_standalone_needs_nothing(
        cluster_name in field_strategy(),
        bind_address in field_strategy(),
        initial_hosts in field_strategy(),
        persistence in prop::option::of(Just(false)),
    ) {
        let mut config = CacheEngineConfig::new(CacheTopologyType::Standalone);
        config.cluster_name = cluster_name;
        config.bind_address = bind_address;
        config.initial_hosts = initial_hosts;
        config.persistence_to_file_enabled = persistence;

        prop_assert!(config.validate().is_empty());
    }

    #[test]
    fn prop_validation_is_idempotent(
        topology in topology_strategy(),
        cluster_name in field_strategy(),
        with_auth in any::<bool>(),
        with_encrypt in any::<bool>(),
    ) {
        let mut config = CacheEngineConfig::new(topology)
            .with_bind_address("b")
            .with_initial_hosts("h");
        config.cluster_name = cluster_name;
        if with_auth {
            config.auth_configuration = Some(auth());
        }
        if with_encrypt {
            config.encrypt_configuration = Some(encrypt());
        }

        prop_assert_eq!(config.validate(), config.validate());
    }
}
