//! Health Monitoring
//!
//! Named health indicators aggregated into one operator-facing response, plus
//! the cache cluster check registered by the bundle.

mod cache_health;
mod health;

pub use cache_health::{CacheHealthCheck, CACHE_HEALTH_CHECK, NODE_NOT_RUNNING, SINGLE_NODE_CLUSTER};
pub use health::{Health, HealthCheckResult, HealthIndicator, HealthRegistry, HealthResponse, HealthStatus};
