//! Cache Engine Capabilities
//!
//! The engine is a collaborator: this layer configures it, starts and stops
//! it, and reads its status. Everything it needs from an engine is captured by
//! three traits:
//!
//! - [`EngineFactory`] builds an engine from an [`EngineDescriptor`]
//! - [`CacheEngine`] is the running instance (lifecycle + membership reads)
//! - [`CacheStore`] is one named cache region with its statistics
//!
//! [`EmbeddedEngine`] is the in-process implementation shipped with the crate.

mod embedded;
mod persistence;
mod store;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::topology::EngineDescriptor;

pub use embedded::{EmbeddedEngine, EmbeddedEngineFactory};
pub use persistence::FileStore;
pub use store::{Region, RegionStatistics};

/// Lifecycle status reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Instantiated,
    Initializing,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl EngineStatus {
    pub fn is_running(&self) -> bool {
        *self == EngineStatus::Running
    }

    /// A terminated or failed engine cannot be started again
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineStatus::Terminated | EngineStatus::Failed)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineStatus::Instantiated => "INSTANTIATED",
            EngineStatus::Initializing => "INITIALIZING",
            EngineStatus::Running => "RUNNING",
            EngineStatus::Stopping => "STOPPING",
            EngineStatus::Terminated => "TERMINATED",
            EngineStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Per-cache statistics exposed as gauges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    NumberOfEntries,
    AverageReadTime,
    AverageWriteTime,
    Evictions,
    Hits,
    Misses,
    RemoveHits,
    RemoveMisses,
    Stores,
}

impl Statistic {
    pub const ALL: [Statistic; 9] = [
        Statistic::NumberOfEntries,
        Statistic::AverageReadTime,
        Statistic::AverageWriteTime,
        Statistic::Evictions,
        Statistic::Hits,
        Statistic::Misses,
        Statistic::RemoveHits,
        Statistic::RemoveMisses,
        Statistic::Stores,
    ];

    /// Engine-side attribute name
    pub fn attribute(&self) -> &'static str {
        match self {
            Statistic::NumberOfEntries => "numberOfEntries",
            Statistic::AverageReadTime => "averageReadTime",
            Statistic::AverageWriteTime => "averageWriteTime",
            Statistic::Evictions => "evictions",
            Statistic::Hits => "hits",
            Statistic::Misses => "misses",
            Statistic::RemoveHits => "removeHits",
            Statistic::RemoveMisses => "removeMisses",
            Statistic::Stores => "stores",
        }
    }

    /// Suffix used in the metric name
    pub fn metric_suffix(&self) -> &'static str {
        match self {
            Statistic::NumberOfEntries => "number_of_entries",
            Statistic::AverageReadTime => "average_read_time",
            Statistic::AverageWriteTime => "average_write_time",
            Statistic::Evictions => "evictions",
            Statistic::Hits => "hits",
            Statistic::Misses => "misses",
            Statistic::RemoveHits => "remove_hits",
            Statistic::RemoveMisses => "remove_misses",
            Statistic::Stores => "stores",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Statistic::NumberOfEntries => "Number of entries currently in the cache",
            Statistic::AverageReadTime => "Average read time in milliseconds",
            Statistic::AverageWriteTime => "Average write time in milliseconds",
            Statistic::Evictions => "Number of entries removed by the engine",
            Statistic::Hits => "Number of read hits",
            Statistic::Misses => "Number of read misses",
            Statistic::RemoveHits => "Number of removals that found an entry",
            Statistic::RemoveMisses => "Number of removals that found nothing",
            Statistic::Stores => "Number of writes",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// One named cache region
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Insert or replace, returning the previous value
    fn put(&self, key: &str, value: serde_json::Value) -> Option<serde_json::Value>;

    fn remove(&self, key: &str) -> Option<serde_json::Value>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current value of a statistic
    fn statistic(&self, statistic: Statistic) -> f64;
}

impl fmt::Debug for dyn CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name())
            .field("len", &self.len())
            .finish()
    }
}

/// A built engine instance
pub trait CacheEngine: Send + Sync {
    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn status(&self) -> EngineStatus;

    /// Member addresses, `None` when the engine has no cluster support
    fn members(&self) -> Option<Vec<String>>;

    fn address(&self) -> Option<String>;

    fn coordinator(&self) -> Option<String>;

    fn cluster_name(&self) -> Option<String>;

    fn cache_names(&self) -> BTreeSet<String>;

    /// Named region, created on first access
    fn cache(&self, name: &str) -> Result<Arc<dyn CacheStore>>;
}

/// Builds engines from descriptors
pub trait EngineFactory: Send + Sync {
    fn build(&self, descriptor: &EngineDescriptor) -> Result<Box<dyn CacheEngine>>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_status_display() {
        assert_eq!(EngineStatus::Running.to_string(), "RUNNING");
        assert_eq!(EngineStatus::Terminated.to_string(), "TERMINATED");
        assert!(EngineStatus::Running.is_running());
        assert!(!EngineStatus::Instantiated.is_running());
        assert!(EngineStatus::Failed.is_terminal());
    }

    #[test]
    fn test_statistic_names_are_unique() {
        let attributes: HashSet<_> = Statistic::ALL.iter().map(|s| s.attribute()).collect();
        let suffixes: HashSet<_> = Statistic::ALL.iter().map(|s| s.metric_suffix()).collect();
        assert_eq!(attributes.len(), 9);
        assert_eq!(suffixes.len(), 9);
    }
}
