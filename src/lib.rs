//! cachekeeper - Embedded Cache Integration Layer
//!
//! Configures, starts, monitors and exposes diagnostics for an embedded,
//! optionally clustered, in-process cache.
//!
//! # Architecture
//!
//! ```text
//! CacheEngineConfig ──▶ resolve ──▶ EngineDescriptor ──▶ EngineFactory
//!   (validated)                       (+ transport)            │
//!                                                              ▼
//!          CacheHealthCheck ◀── ClusterView ── CacheManagerHandle ── Managed ──▶ lifecycle
//!          ClusterDiagnostics ◀─────┘                │
//!                                                    └── Cache<V> + gauges ──▶ prometheus
//! ```
//!
//! # Topologies
//!
//! - `standalone`: single node, no clustering
//! - `insecure`: replicated cluster without authentication or encryption
//! - `clustered`: replicated cluster with authentication and encryption
//!
//! # Modules
//!
//! - [`config`] - Configuration model, validation rules and YAML loading
//! - [`topology`] - Engine descriptors and the topology resolver
//! - [`engine`] - Engine capability traits and the embedded engine
//! - [`manager`] - Cache manager lifecycle wrapper and typed caches
//! - [`monitoring`] - Health checks
//! - [`diagnostics`] - Cluster diagnostics read model
//! - [`bundle`] - Host integration
//! - [`server`] - HTTP surface
//! - [`error`] - Error types

pub mod bundle;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod manager;
pub mod monitoring;
pub mod server;
pub mod topology;

// Re-export commonly used types
pub use bundle::{CacheBundle, HostEnvironment};
pub use config::{CacheEngineConfig, CacheTopologyType, ServiceConfig, ValidatedConfig};
pub use diagnostics::ClusterDiagnostics;
pub use error::{Error, Result};
pub use manager::{Cache, CacheManagerHandle, ClusterView, Managed};
pub use monitoring::{CacheHealthCheck, HealthRegistry};
