//! Cluster Diagnostics
//!
//! Read-only snapshot of the node and its cluster, computed fresh on every
//! request. Missing data degrades to documented sentinels instead of failing:
//!
//! - `members`: `["NO MEMBERS"]` when the engine has no cluster support
//! - `address` / `coordinator`: `"null"` when unknown
//! - `clusterSize`: 1 for standalone or unavailable membership
//!
//! `expectedClusterSize` is the configured peer count (one more than the
//! number of commas in the initial hosts), not a live measurement.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{CacheEngineConfig, CacheTopologyType};
use crate::manager::ClusterView;

/// Member list reported when membership is unavailable
pub const NO_MEMBERS: &str = "NO MEMBERS";

const NULL: &str = "null";

/// Diagnostics document served at `/cache/details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDiagnostics {
    pub address: String,
    pub members: Vec<String>,
    pub cluster_name: String,
    pub cluster_size: usize,
    pub expected_cluster_size: usize,
    pub coordinator: String,
    pub status: String,
    pub cache_names: Vec<String>,
}

impl ClusterDiagnostics {
    pub fn from_view(view: &dyn ClusterView, config: &CacheEngineConfig) -> Self {
        let standalone = config.topology == CacheTopologyType::Standalone;

        Self {
            address: view.address().unwrap_or_else(|| NULL.to_string()),
            members: view
                .members()
                .unwrap_or_else(|| vec![NO_MEMBERS.to_string()]),
            cluster_name: view.cluster_name().unwrap_or_else(|| NULL.to_string()),
            cluster_size: if standalone { 1 } else { view.node_count() },
            expected_cluster_size: expected_cluster_size(config),
            coordinator: view.coordinator().unwrap_or_else(|| NULL.to_string()),
            status: view.status().to_string(),
            cache_names: view.cache_names().into_iter().collect(),
        }
    }
}

/// Configured cluster size: 1 for standalone, otherwise peers + 1
pub fn expected_cluster_size(config: &CacheEngineConfig) -> usize {
    match config.topology {
        CacheTopologyType::Standalone => 1,
        CacheTopologyType::Insecure | CacheTopologyType::Clustered => {
            let hosts = config.initial_hosts.as_deref().unwrap_or_default();
            hosts.matches(',').count() + 1
        }
    }
}

/// Diagnostics source kept for the HTTP resource
#[derive(Clone)]
pub struct DiagnosticsResource {
    view: Arc<dyn ClusterView>,
    config: CacheEngineConfig,
}

impl DiagnosticsResource {
    pub fn new(view: Arc<dyn ClusterView>, config: CacheEngineConfig) -> Self {
        Self { view, config }
    }

    pub fn snapshot(&self) -> ClusterDiagnostics {
        ClusterDiagnostics::from_view(self.view.as_ref(), &self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{clustered, insecure};
    use crate::engine::{EmbeddedEngineFactory, EngineFactory, EngineStatus};
    use crate::manager::test_support::FixedView;
    use crate::manager::{CacheManagerHandle, Managed};
    use crate::topology::resolve;
    use prometheus::Registry;

    #[test]
    fn test_expected_cluster_size() {
        assert_eq!(expected_cluster_size(&clustered()), 3);
        assert_eq!(expected_cluster_size(&insecure()), 2);

        let standalone = CacheEngineConfig::new(CacheTopologyType::Standalone)
            .with_initial_hosts("h1,h2,h3,h4");
        assert_eq!(expected_cluster_size(&standalone), 1);
    }

    #[test]
    fn test_expected_size_counts_commas_not_hosts() {
        let config = clustered().with_initial_hosts("h1,,h2,");
        assert_eq!(expected_cluster_size(&config), 4);

        let config = clustered().with_initial_hosts("h1[7800],h2[7800]");
        assert_eq!(expected_cluster_size(&config), 2);

        let mut config = clustered();
        config.initial_hosts = None;
        assert_eq!(expected_cluster_size(&config), 1);
    }

    #[test]
    fn test_no_membership_sentinels() {
        let config = CacheEngineConfig::new(CacheTopologyType::Standalone);
        let diagnostics = ClusterDiagnostics::from_view(&FixedView::running(), &config);

        assert_eq!(diagnostics.members, vec![NO_MEMBERS.to_string()]);
        assert_eq!(diagnostics.cluster_size, 1);
        assert_eq!(diagnostics.address, "null");
        assert_eq!(diagnostics.coordinator, "null");
        assert_eq!(diagnostics.cluster_name, "null");
        assert_eq!(diagnostics.status, "RUNNING");
    }

    #[test]
    fn test_clustered_snapshot() {
        let mut view = FixedView::running().with_members(&["a:7800", "b:7800"]);
        view.cluster_name = Some("sessions".to_string());
        view.cache_names = ["tokens", "sessions"].iter().map(|s| s.to_string()).collect();

        let diagnostics = ClusterDiagnostics::from_view(&view, &clustered());
        assert_eq!(diagnostics.cluster_size, 2);
        assert_eq!(diagnostics.expected_cluster_size, 3);
        assert_eq!(diagnostics.address, "a:7800");
        assert_eq!(diagnostics.coordinator, "a:7800");
        assert_eq!(diagnostics.cache_names, vec!["sessions", "tokens"]);
    }

    #[test]
    fn test_clustered_without_membership_defaults_to_one() {
        let view = FixedView::running().with_status(EngineStatus::Instantiated);
        let diagnostics = ClusterDiagnostics::from_view(&view, &clustered());
        assert_eq!(diagnostics.cluster_size, 1);
        assert_eq!(diagnostics.status, "INSTANTIATED");
    }

    #[test]
    fn test_json_field_names() {
        let view = FixedView::running().with_members(&["a:7800"]);
        let json = serde_json::to_value(ClusterDiagnostics::from_view(&view, &insecure())).unwrap();
        for field in [
            "address",
            "members",
            "clusterName",
            "clusterSize",
            "expectedClusterSize",
            "coordinator",
            "status",
            "cacheNames",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_resource_snapshot_is_fresh() {
        let config = clustered();
        let descriptor = resolve(&config.clone().into_validated().unwrap());
        let engine = EmbeddedEngineFactory.build(&descriptor).unwrap();
        let manager = Arc::new(CacheManagerHandle::new(engine, Registry::new()));
        let resource = DiagnosticsResource::new(manager.clone(), config);

        let before = resource.snapshot();
        assert_eq!(before.status, "INSTANTIATED");
        assert!(before.cache_names.is_empty());

        manager.start().unwrap();
        let _ = manager.get_cache::<String>("tokens").unwrap();

        let after = resource.snapshot();
        assert_eq!(after.status, "RUNNING");
        assert_eq!(after.cache_names, vec!["tokens"]);
        manager.stop().unwrap();
    }
}
