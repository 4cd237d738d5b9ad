//! Managed lifecycle registry

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::manager::Managed;

/// Ordered set of managed objects started before serving and stopped on
/// shutdown
#[derive(Default)]
pub struct LifecycleRegistry {
    managed: RwLock<Vec<Arc<dyn Managed>>>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manage(&self, managed: Arc<dyn Managed>) {
        info!(name = managed.name(), "Registered managed object");
        self.managed.write().push(managed);
    }

    pub fn len(&self) -> usize {
        self.managed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start in registration order, stopping at the first failure
    pub fn start_all(&self) -> Result<()> {
        for managed in self.snapshot() {
            managed.start()?;
            info!(name = managed.name(), "Started");
        }
        Ok(())
    }

    /// Stop in reverse order; failures are logged and skipped
    pub fn stop_all(&self) {
        for managed in self.snapshot().into_iter().rev() {
            match managed.stop() {
                Ok(()) => info!(name = managed.name(), "Stopped"),
                Err(e) => warn!(name = managed.name(), "Failed to stop: {}", e),
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Managed>> {
        self.managed.read().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
