//! Cache Manager Lifecycle Wrapper
//!
//! [`CacheManagerHandle`] exclusively owns the built engine and shares the
//! host's metrics registry. Its surface is split into two capabilities over
//! the same handle:
//!
//! - [`Managed`]: start/stop, driven once each by the host lifecycle
//! - [`ClusterView`]: read-only node, cluster and membership queries used by
//!   the health check and the diagnostics resource
//!
//! Typed cache access goes through [`CacheManagerHandle::get_cache`], which
//! registers the region's statistic gauges on first access.

mod gauges;

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::Registry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{CacheEngine, CacheStore, EngineStatus};
use crate::error::Result;

pub use gauges::{metric_name, METRICS_ROOT};

// =============================================================================
// Capabilities
// =============================================================================

/// An object whose lifecycle is driven by the host
pub trait Managed: Send + Sync {
    /// Name used in lifecycle logs
    fn name(&self) -> &str;

    fn start(&self) -> Result<()>;

    /// Best-effort; implementations log rather than fail
    fn stop(&self) -> Result<()>;
}

/// Read-only view of the node and its cluster
pub trait ClusterView: Send + Sync {
    /// True iff the engine reports itself running
    fn check_node(&self) -> bool;

    /// True iff more than one member is visible
    fn check_cluster(&self) -> bool {
        self.node_count() > 1
    }

    /// Visible member count; unavailable membership counts as one
    fn node_count(&self) -> usize {
        self.members().map_or(1, |members| members.len())
    }

    /// `None` when the engine has no cluster support
    fn members(&self) -> Option<Vec<String>>;

    fn address(&self) -> Option<String>;

    fn coordinator(&self) -> Option<String>;

    fn cluster_name(&self) -> Option<String>;

    fn cache_names(&self) -> BTreeSet<String>;

    fn status(&self) -> EngineStatus;
}

// =============================================================================
// CacheManagerHandle
// =============================================================================

/// Live wrapper around the engine
pub struct CacheManagerHandle {
    engine: Box<dyn CacheEngine>,
    metrics: Registry,
    /// Caches whose gauges this handle has registered
    instrumented: Mutex<HashSet<String>>,
}

impl CacheManagerHandle {
    pub fn new(engine: Box<dyn CacheEngine>, metrics: Registry) -> Self {
        Self {
            engine,
            metrics,
            instrumented: Mutex::new(HashSet::new()),
        }
    }

    /// Typed handle to a named cache, created on first access.
    ///
    /// The first call for a name registers the cache's statistic gauges
    /// before the engine creates the region. If registration or creation
    /// fails, the error is returned and neither gauges nor region remain.
    pub fn get_cache<V>(&self, name: &str) -> Result<Cache<V>>
    where
        V: Serialize + DeserializeOwned,
    {
        let mut instrumented = self.instrumented.lock();
        if instrumented.contains(name) {
            return Ok(Cache::new(self.engine.cache(name)?));
        }

        let statistics = gauges::register_statistics(&self.metrics, name)?;
        let store = match self.engine.cache(name) {
            Ok(store) => store,
            Err(e) => {
                statistics.unregister();
                return Err(e);
            }
        };
        statistics.bind(Arc::clone(&store));
        instrumented.insert(name.to_string());
        debug!(cache = name, "Registered cache statistics");

        Ok(Cache::new(store))
    }

    pub fn metrics(&self) -> &Registry {
        &self.metrics
    }
}

impl fmt::Debug for CacheManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManagerHandle")
            .field("status", &self.engine.status())
            .field("instrumented", &*self.instrumented.lock())
            .finish()
    }
}

impl Managed for CacheManagerHandle {
    fn name(&self) -> &str {
        "cache manager"
    }

    fn start(&self) -> Result<()> {
        info!("Starting cache manager");
        self.engine.start()
    }

    fn stop(&self) -> Result<()> {
        info!("Stopping cache manager");
        if let Err(e) = self.engine.stop() {
            warn!("Cache manager did not stop cleanly: {}", e);
        }
        Ok(())
    }
}

impl ClusterView for CacheManagerHandle {
    fn check_node(&self) -> bool {
        let status = self.engine.status();
        if !status.is_running() {
            info!(%status, "Cache engine is not running");
        }
        status.is_running()
    }

    fn members(&self) -> Option<Vec<String>> {
        self.engine.members()
    }

    fn address(&self) -> Option<String> {
        self.engine.address()
    }

    fn coordinator(&self) -> Option<String> {
        self.engine.coordinator()
    }

    fn cluster_name(&self) -> Option<String> {
        self.engine.cluster_name()
    }

    fn cache_names(&self) -> BTreeSet<String> {
        self.engine.cache_names()
    }

    fn status(&self) -> EngineStatus {
        self.engine.status()
    }
}

// =============================================================================
// Typed cache handle
// =============================================================================

/// Pass-through handle to one cache region, typed by value
pub struct Cache<V> {
    store: Arc<dyn CacheStore>,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _value: PhantomData,
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.store.name())
            .field("len", &self.store.len())
            .finish()
    }
}

impl<V> Cache<V>
where
    V: Serialize + DeserializeOwned,
{
    fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn get(&self, key: &str) -> Result<Option<V>> {
        self.store.get(key).map(decode).transpose()
    }

    /// Insert or replace, returning the previous value
    pub fn put(&self, key: &str, value: &V) -> Result<Option<V>> {
        let value = serde_json::to_value(value)?;
        self.store.put(key, value).map(decode).transpose()
    }

    pub fn remove(&self, key: &str) -> Result<Option<V>> {
        self.store.remove(key).map(decode).transpose()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn decode<V: DeserializeOwned>(value: serde_json::Value) -> Result<V> {
    Ok(serde_json::from_value(value)?)
}

// =============================================================================
// Tests
// =============================================================================
