//! Cache cluster health check
//!
//! ```text
//! standalone?            ── yes ──▶ Healthy
//!     │ no
//! node running?          ── no ───▶ Unhealthy (node)
//!     │ yes
//! more than one member?  ── no ───▶ Unhealthy (cluster)
//!     │ yes
//!     ▼
//! Healthy ("Node Count: N")
//! ```
//!
//! Node liveness is checked before membership: a membership read from a node
//! that is not running is meaningless.

use std::sync::Arc;

use super::health::{Health, HealthIndicator};
use crate::config::CacheTopologyType;
use crate::manager::ClusterView;

/// Name the check is registered under
pub const CACHE_HEALTH_CHECK: &str = "cache health";

pub const NODE_NOT_RUNNING: &str = "This node's cache engine is not in a running state!";

pub const SINGLE_NODE_CLUSTER: &str =
    "Something is wrong with the cache cluster. This node thinks it's the only node in the cluster.";

/// Health of the local node and the cluster it belongs to
pub struct CacheHealthCheck {
    topology: CacheTopologyType,
    view: Arc<dyn ClusterView>,
}

impl CacheHealthCheck {
    pub fn new(topology: CacheTopologyType, view: Arc<dyn ClusterView>) -> Self {
        Self { topology, view }
    }
}

impl HealthIndicator for CacheHealthCheck {
    fn check(&self) -> Health {
        if !self.topology.is_clustered_family() {
            return Health::Healthy;
        }
        if !self.view.check_node() {
            return Health::Unhealthy(NODE_NOT_RUNNING.to_string());
        }
        if !self.view.check_cluster() {
            return Health::Unhealthy(SINGLE_NODE_CLUSTER.to_string());
        }
        Health::HealthyWith(format!("Node Count: {}", self.view.node_count()))
    }
}

// =============================================================================
// Tests
// =============================================================================
