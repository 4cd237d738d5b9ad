//! Per-cache statistic gauges
//!
//! Each statistic of a cache region becomes one prometheus gauge named
//! `cachekeeper_<cache>_<statistic>`. The gauge is a live view: its value is
//! read from the region when the registry is gathered.
//!
//! Gauges are registered before the region is bound to them, so a name that
//! cannot be registered is rejected without creating the region.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts, Registry};

use crate::engine::{CacheStore, Statistic};
use crate::error::{Error, Result};

/// Fixed root every cache metric is namespaced under
pub const METRICS_ROOT: &str = "cachekeeper";

/// Metric name for one statistic of one cache
pub fn metric_name(cache: &str, statistic: Statistic) -> String {
    let cache: String = cache
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => '_',
            other => other,
        })
        .collect();
    format!("{}_{}_{}", METRICS_ROOT, cache, statistic.metric_suffix())
}

/// Region the gauges of one cache read from, once bound
type StoreSlot = Arc<RwLock<Option<Arc<dyn CacheStore>>>>;

/// Gauge reading one statistic of a region at scrape time
struct StatisticGauge {
    slot: StoreSlot,
    statistic: Statistic,
    gauge: Gauge,
}

impl StatisticGauge {
    fn new(cache: &str, statistic: Statistic, slot: StoreSlot) -> Result<Self> {
        let name = metric_name(cache, statistic);
        let opts = Opts::new(name.clone(), statistic.help()).const_label("cache", cache);
        let gauge = Gauge::with_opts(opts)
            .map_err(|source| Error::MetricsRegistration { name, source })?;

        Ok(Self {
            slot,
            statistic,
            gauge,
        })
    }
}

impl Collector for StatisticGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if let Some(store) = self.slot.read().as_ref() {
            self.gauge.set(store.statistic(self.statistic));
        }
        self.gauge.collect()
    }
}

/// The nine gauges of one cache, registered in a shared registry
pub(crate) struct CacheStatistics {
    registry: Registry,
    slot: StoreSlot,
    registered: Vec<Gauge>,
}

impl fmt::Debug for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStatistics")
            .field("registered", &self.registered.len())
            .field("bound", &self.slot.read().is_some())
            .finish()
    }
}

impl CacheStatistics {
    /// Point the gauges at the cache's region
    pub(crate) fn bind(&self, store: Arc<dyn CacheStore>) {
        *self.slot.write() = Some(store);
    }

    /// Remove every gauge this cache registered
    pub(crate) fn unregister(&self) {
        for gauge in &self.registered {
            // Matched by descriptor, so a clone removes the registered collector
            let _ = self.registry.unregister(Box::new(gauge.clone()));
        }
    }
}

/// Register the nine statistic gauges of a cache, all or nothing
pub(crate) fn register_statistics(registry: &Registry, cache: &str) -> Result<CacheStatistics> {
    let slot: StoreSlot = Arc::new(RwLock::new(None));
    let gauges = Statistic::ALL
        .into_iter()
        .map(|statistic| StatisticGauge::new(cache, statistic, Arc::clone(&slot)))
        .collect::<Result<Vec<_>>>()?;

    let mut statistics = CacheStatistics {
        registry: registry.clone(),
        slot,
        registered: Vec::with_capacity(gauges.len()),
    };
    for gauge in gauges {
        let name = metric_name(cache, gauge.statistic);
        let handle = gauge.gauge.clone();
        if let Err(source) = registry.register(Box::new(gauge)) {
            statistics.unregister();
            return Err(Error::MetricsRegistration { name, source });
        }
        statistics.registered.push(handle);
    }
    Ok(statistics)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Region;
    use assert_matches::assert_matches;
    use prometheus::{Encoder, TextEncoder};
    use serde_json::json;

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(
            metric_name("sessions", Statistic::NumberOfEntries),
            "cachekeeper_sessions_number_of_entries"
        );
        assert_eq!(
            metric_name("user-sessions.v2 eu", Statistic::RemoveMisses),
            "cachekeeper_user_sessions_v2_eu_remove_misses"
        );
    }

    #[test]
    fn test_gauges_read_live_values() {
        let registry = Registry::new();
        let store: Arc<dyn CacheStore> = Arc::new(Region::new("sessions", None));
        register_statistics(&registry, "sessions")
            .unwrap()
            .bind(Arc::clone(&store));

        store.put("a", json!(1));
        store.put("b", json!(2));
        store.get("a");

        let text = render(&registry);
        assert!(text.contains("cachekeeper_sessions_number_of_entries{cache=\"sessions\"} 2"));
        assert!(text.contains("cachekeeper_sessions_stores{cache=\"sessions\"} 2"));
        assert!(text.contains("cachekeeper_sessions_hits{cache=\"sessions\"} 1"));
        assert_eq!(registry.gather().len(), 9);
    }

    #[test]
    fn test_unbound_gauges_read_zero() {
        let registry = Registry::new();
        let _statistics = register_statistics(&registry, "sessions").unwrap();
        assert!(render(&registry).contains("cachekeeper_sessions_hits{cache=\"sessions\"} 0"));
    }

    #[test]
    fn test_invalid_name_fails() {
        let registry = Registry::new();
        assert_matches!(
            register_statistics(&registry, "bad/name"),
            Err(Error::MetricsRegistration { .. })
        );
        assert!(registry.gather().is_empty());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let _statistics = register_statistics(&registry, "sessions").unwrap();
        assert_matches!(
            register_statistics(&registry, "sessions"),
            Err(Error::MetricsRegistration { .. })
        );
        assert_eq!(registry.gather().len(), 9);
    }

    #[test]
    fn test_partial_registration_is_rolled_back() {
        let registry = Registry::new();
        let taken = Gauge::with_opts(Opts::new(
            metric_name("sessions", Statistic::Hits),
            "registered elsewhere",
        ))
        .unwrap();
        registry.register(Box::new(taken)).unwrap();

        match register_statistics(&registry, "sessions") {
            Err(Error::MetricsRegistration { name, .. }) => {
                assert_eq!(name, "cachekeeper_sessions_hits")
            }
            other => panic!("expected a registration error, got {:?}", other.err()),
        }
        assert_eq!(registry.gather().len(), 1);

        let statistics = register_statistics(&registry, "tokens").unwrap();
        assert_eq!(registry.gather().len(), 10);
        statistics.unregister();
        assert_eq!(registry.gather().len(), 1);
    }
}
