//! Embedded Engine
//!
//! In-process engine honouring an [`EngineDescriptor`]. Without a transport it
//! has no cluster support at all; with one it presents a single-member view
//! of the configured cluster, with the local node as coordinator.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::persistence::FileStore;
use super::store::Region;
use super::{CacheEngine, CacheStore, EngineFactory, EngineStatus};
use crate::error::{Error, Result};
use crate::topology::{keys, EngineDescriptor};

/// In-process cache engine
pub struct EmbeddedEngine {
    descriptor: EngineDescriptor,
    /// Local member address, present only with a transport
    local_address: Option<String>,
    file_store: Option<FileStore>,
    status: RwLock<EngineStatus>,
    regions: DashMap<String, Arc<Region>>,
}

impl EmbeddedEngine {
    /// Construct an engine; it is not running until [`CacheEngine::start`]
    pub fn new(descriptor: EngineDescriptor) -> Result<Self> {
        let local_address = match &descriptor.transport {
            Some(transport) => {
                let address = transport.properties.get(keys::TCP_ADDRESS).ok_or_else(|| {
                    Error::EngineStart(format!("transport property {} is missing", keys::TCP_ADDRESS))
                })?;
                let port = transport.properties.get(keys::TCP_PORT).ok_or_else(|| {
                    Error::EngineStart(format!("transport property {} is missing", keys::TCP_PORT))
                })?;
                Some(format!("{}:{}", address, port))
            }
            None => None,
        };

        Ok(Self {
            file_store: descriptor.cache.persistence.clone().map(FileStore::new),
            local_address,
            descriptor,
            status: RwLock::new(EngineStatus::Instantiated),
            regions: DashMap::new(),
        })
    }

    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    fn create_region(&self, name: &str) -> Result<Region> {
        let lifespan = self.descriptor.cache.expiration.lifespan();
        let region = match &self.file_store {
            Some(store) => Region::with_entries(name, lifespan, store.load(name)?),
            None => Region::new(name, lifespan),
        };

        if self.descriptor.cache.statistics_enabled {
            Ok(region)
        } else {
            Ok(region.without_statistics())
        }
    }

    fn flush_all(&self) -> Result<()> {
        let Some(store) = &self.file_store else {
            return Ok(());
        };

        let mut failures = Vec::new();
        for region in self.regions.iter() {
            if let Err(e) = store.flush(region.key(), region.value().snapshot()) {
                warn!(cache = %region.key(), "Failed to flush cache: {}", e);
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::EngineStop(failures.join("; ")))
        }
    }
}

impl CacheEngine for EmbeddedEngine {
    fn start(&self) -> Result<()> {
        let mut status = self.status.write();
        if status.is_running() {
            return Ok(());
        }
        if status.is_terminal() {
            return Err(Error::EngineStart(format!(
                "engine is {} and cannot be restarted",
                *status
            )));
        }

        *status = EngineStatus::Initializing;
        match &self.descriptor.transport {
            Some(transport) => info!(
                cluster = %transport.cluster_name,
                stack = %transport.profile,
                mode = %self.descriptor.cache.mode(),
                "Starting embedded cache engine"
            ),
            None => info!(mode = %self.descriptor.cache.mode(), "Starting embedded cache engine"),
        }
        if let Some(store) = &self.file_store {
            if let Err(e) = std::fs::create_dir_all(store.location()) {
                *status = EngineStatus::Failed;
                return Err(Error::EngineStart(format!(
                    "cannot create persistence location {}: {}",
                    store.location().display(),
                    e
                )));
            }
        }

        *status = EngineStatus::Running;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        {
            let mut status = self.status.write();
            if *status != EngineStatus::Running {
                *status = EngineStatus::Terminated;
                return Ok(());
            }
            *status = EngineStatus::Stopping;
        }

        info!("Stopping embedded cache engine");
        let flushed = self.flush_all();
        *self.status.write() = EngineStatus::Terminated;
        flushed
    }

    fn status(&self) -> EngineStatus {
        *self.status.read()
    }

    fn members(&self) -> Option<Vec<String>> {
        self.local_address.clone().map(|address| vec![address])
    }

    fn address(&self) -> Option<String> {
        self.local_address.clone()
    }

    fn coordinator(&self) -> Option<String> {
        self.local_address.clone()
    }

    fn cluster_name(&self) -> Option<String> {
        self.descriptor
            .transport
            .as_ref()
            .map(|t| t.cluster_name.clone())
    }

    fn cache_names(&self) -> BTreeSet<String> {
        self.regions.iter().map(|r| r.key().clone()).collect()
    }

    fn cache(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let status = self.status();
        if !status.is_running() {
            return Err(Error::UnknownCache(format!(
                "{}: engine is {}",
                name, status
            )));
        }

        if let Some(region) = self.regions.get(name) {
            return Ok(region.value().clone());
        }

        let region = match self.regions.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(e) => e.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                debug!(cache = name, "Creating cache region");
                e.insert(Arc::new(self.create_region(name)?)).clone()
            }
        };
        Ok(region)
    }
}

/// Factory producing [`EmbeddedEngine`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedEngineFactory;

impl EngineFactory for EmbeddedEngineFactory {
    fn build(&self, descriptor: &EngineDescriptor) -> Result<Box<dyn CacheEngine>> {
        Ok(Box::new(EmbeddedEngine::new(descriptor.clone())?))
    }
}

// =============================================================================
// Tests
// =============================================================================
