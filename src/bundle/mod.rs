//! Host Integration Bundle
//!
//! Wires the cache into a host process:
//!
//! ```text
//!  configuration ──▶ validate ──▶ resolve ──▶ EngineFactory::build
//!                                                   │
//!                                                   ▼
//!                                         CacheManagerHandle
//!                                                   │
//!                ┌──────────────────────┬───────────┴──────────┐
//!                ▼                      ▼                      ▼
//!       LifecycleRegistry        HealthRegistry       DiagnosticsResource
//!       (start/stop)             ("cache health")     (/cache/details)
//! ```

mod lifecycle;

use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::Registry;
use tracing::info;

use crate::config::{CacheServiceConfiguration, CacheTopologyType};
use crate::diagnostics::DiagnosticsResource;
use crate::engine::{EmbeddedEngineFactory, EngineFactory};
use crate::error::Result;
use crate::manager::CacheManagerHandle;
use crate::monitoring::{CacheHealthCheck, HealthRegistry, CACHE_HEALTH_CHECK};
use crate::topology;

pub use lifecycle::LifecycleRegistry;

/// Registration points the host offers
pub struct HostEnvironment {
    lifecycle: LifecycleRegistry,
    health_checks: HealthRegistry,
    metrics: Registry,
    diagnostics: RwLock<Option<DiagnosticsResource>>,
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self::with_metrics(Registry::new())
    }

    /// Environment sharing an existing metrics registry
    pub fn with_metrics(metrics: Registry) -> Self {
        Self {
            lifecycle: LifecycleRegistry::new(),
            health_checks: HealthRegistry::new(),
            metrics,
            diagnostics: RwLock::new(None),
        }
    }

    pub fn lifecycle(&self) -> &LifecycleRegistry {
        &self.lifecycle
    }

    pub fn health_checks(&self) -> &HealthRegistry {
        &self.health_checks
    }

    pub fn metrics(&self) -> &Registry {
        &self.metrics
    }

    pub fn register_diagnostics(&self, resource: DiagnosticsResource) {
        *self.diagnostics.write() = Some(resource);
    }

    pub fn diagnostics(&self) -> Option<DiagnosticsResource> {
        self.diagnostics.read().clone()
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the cache into a host environment
pub struct CacheBundle {
    factory: Box<dyn EngineFactory>,
    manager: RwLock<Option<Arc<CacheManagerHandle>>>,
}

impl CacheBundle {
    /// Bundle backed by the embedded engine
    pub fn new() -> Self {
        Self::with_factory(Box::new(EmbeddedEngineFactory))
    }

    pub fn with_factory(factory: Box<dyn EngineFactory>) -> Self {
        Self {
            factory,
            manager: RwLock::new(None),
        }
    }

    /// Build the cache manager and register it with the host.
    ///
    /// The engine is built but not started; the lifecycle registry starts it.
    pub fn run(
        &self,
        configuration: &impl CacheServiceConfiguration,
        env: &HostEnvironment,
    ) -> Result<Arc<CacheManagerHandle>> {
        let config = configuration.cache().clone().into_validated()?;

        match config.topology {
            CacheTopologyType::Standalone => info!("Running as a standalone cache"),
            CacheTopologyType::Insecure => info!(
                cluster = config.cluster_name_or_placeholder(),
                "Running as an insecure clustered cache"
            ),
            CacheTopologyType::Clustered => info!(
                cluster = config.cluster_name_or_placeholder(),
                "Running as a secure clustered cache"
            ),
        }

        let descriptor = topology::resolve(&config);
        let engine = self.factory.build(&descriptor)?;
        let manager = Arc::new(CacheManagerHandle::new(engine, env.metrics().clone()));

        // The lifecycle only sees the handle once every registration succeeded
        env.health_checks().register(
            CACHE_HEALTH_CHECK,
            Arc::new(CacheHealthCheck::new(config.topology, manager.clone())),
        )?;
        env.register_diagnostics(DiagnosticsResource::new(
            manager.clone(),
            config.into_inner(),
        ));
        env.lifecycle().manage(manager.clone());

        *self.manager.write() = Some(manager.clone());
        Ok(manager)
    }

    /// Cache manager built by [`CacheBundle::run`]
    pub fn cache_manager(&self) -> Option<Arc<CacheManagerHandle>> {
        self.manager.read().clone()
    }
}

impl Default for CacheBundle {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
