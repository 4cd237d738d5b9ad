//! Health Checks
//!
//! Named health indicators and the aggregate response served to operators.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Outcome reported by one indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// Healthy, with a detail for the operator
    HealthyWith(String),
    /// Unhealthy, with the reason
    Unhealthy(String),
}

impl Health {
    pub fn status(&self) -> HealthStatus {
        match self {
            Health::Healthy | Health::HealthyWith(_) => HealthStatus::Healthy,
            Health::Unhealthy(_) => HealthStatus::Unhealthy,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Health::Healthy => None,
            Health::HealthyWith(message) | Health::Unhealthy(message) => Some(message),
        }
    }
}

/// Something that can report its own health
pub trait HealthIndicator: Send + Sync {
    fn check(&self) -> Health;
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    /// Check name
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    /// Duration of check
    pub duration_ms: u64,
}

impl HealthCheckResult {
    pub fn new(name: impl Into<String>, health: &Health) -> Self {
        Self {
            name: name.into(),
            status: health.status(),
            message: health.message().map(str::to_string),
            duration_ms: 0,
        }
    }

    /// Set duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Worst status across all checks
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn new(checks: Vec<HealthCheckResult>, uptime: Duration) -> Self {
        let status = if checks.iter().all(|c| c.status.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            status,
            checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime.as_secs(),
        }
    }
}

/// Registry of named health indicators
pub struct HealthRegistry {
    start_time: Instant,
    indicators: RwLock<Vec<(String, Arc<dyn HealthIndicator>)>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            indicators: RwLock::new(Vec::new()),
        }
    }

    /// Register an indicator; names are unique
    pub fn register(&self, name: impl Into<String>, indicator: Arc<dyn HealthIndicator>) -> Result<()> {
        let name = name.into();
        let mut indicators = self.indicators.write();
        if indicators.iter().any(|(existing, _)| *existing == name) {
            return Err(Error::Internal(format!(
                "health check '{}' is already registered",
                name
            )));
        }
        indicators.push((name, indicator));
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.indicators.read().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Run a single named check
    pub fn run(&self, name: &str) -> Option<HealthCheckResult> {
        let indicator = self
            .indicators
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, i)| Arc::clone(i))?;
        Some(run_timed(name, indicator.as_ref()))
    }

    /// Run every check in registration order
    pub fn run_all(&self) -> HealthResponse {
        // Snapshot so checks run without holding the lock
        let indicators: Vec<_> = self
            .indicators
            .read()
            .iter()
            .map(|(n, i)| (n.clone(), Arc::clone(i)))
            .collect();

        let checks = indicators
            .iter()
            .map(|(name, indicator)| run_timed(name, indicator.as_ref()))
            .collect();
        HealthResponse::new(checks, self.uptime())
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn run_timed(name: &str, indicator: &dyn HealthIndicator) -> HealthCheckResult {
    let start = Instant::now();
    let health = indicator.check();
    HealthCheckResult::new(name, &health).with_duration(start.elapsed())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Fixed(Health);

    impl HealthIndicator for Fixed {
        fn check(&self) -> Health {
            self.0.clone()
        }
    }

    #[test]
    fn test_health_status_display() {
        assert_eq!(format!("{}", HealthStatus::Healthy), "Healthy");
        assert_eq!(format!("{}", HealthStatus::Unhealthy), "Unhealthy");
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Unhealthy.is_healthy());
    }

    #[test]
    fn test_health_outcomes() {
        assert_eq!(Health::Healthy.status(), HealthStatus::Healthy);
        assert_eq!(Health::Healthy.message(), None);
        assert_eq!(Health::HealthyWith("Node Count: 2".into()).status(), HealthStatus::Healthy);
        assert_eq!(Health::Unhealthy("down".into()).status(), HealthStatus::Unhealthy);
        assert_eq!(Health::Unhealthy("down".into()).message(), Some("down"));
    }

    #[test]
    fn test_health_response_is_worst_status() {
        let checks = vec![
            HealthCheckResult::new("a", &Health::Healthy),
            HealthCheckResult::new("b", &Health::Unhealthy("down".into())),
        ];
        let response = HealthResponse::new(checks, Duration::from_secs(60));
        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(response.uptime_seconds, 60);

        let response = HealthResponse::new(Vec::new(), Duration::ZERO);
        assert_eq!(response.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_registry() {
        let registry = HealthRegistry::new();
        registry
            .register("cache health", Arc::new(Fixed(Health::HealthyWith("Node Count: 2".into()))))
            .unwrap();
        registry.register("disk", Arc::new(Fixed(Health::Healthy))).unwrap();
        assert_eq!(registry.names(), vec!["cache health", "disk"]);

        let response = registry.run_all();
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.checks.len(), 2);
        assert_eq!(response.checks[0].message.as_deref(), Some("Node Count: 2"));

        assert!(registry.run("missing").is_none());
        assert_eq!(registry.run("disk").unwrap().status, HealthStatus::Healthy);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = HealthRegistry::new();
        registry.register("disk", Arc::new(Fixed(Health::Healthy))).unwrap();
        assert_matches!(
            registry.register("disk", Arc::new(Fixed(Health::Healthy))),
            Err(Error::Internal(_))
        );
    }

    #[test]
    fn test_serialization() {
        let response = HealthResponse::new(
            vec![HealthCheckResult::new("cache health", &Health::Healthy)],
            Duration::from_secs(5),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "Healthy");
        assert_eq!(json["uptimeSeconds"], 5);
        assert_eq!(json["checks"][0]["name"], "cache health");
        assert!(json["checks"][0].get("durationMs").is_some());
    }
}
