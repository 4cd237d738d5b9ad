//! Error types for the cache integration layer

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Violation;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring, running or observing the cache
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// One or more validation rules failed
    #[error("Cache configuration is not valid: {}", format_violations(.0))]
    InvalidConfiguration(Vec<Violation>),

    /// Configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigLoad(#[from] serde_yaml::Error),

    /// Duration parse error
    #[error("Failed to parse duration: {0}")]
    DurationParse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// Engine construction or start failed
    #[error("Cache engine failed to start: {0}")]
    EngineStart(String),

    /// Engine stop failed
    #[error("Cache engine failed to stop cleanly: {0}")]
    EngineStop(String),

    /// A cache region was requested from an engine that cannot serve it
    #[error("Cache not available: {0}")]
    UnknownCache(String),

    /// Value could not be converted to or from its stored form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File store load/flush failed
    #[error("Persistence failure for {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    // =========================================================================
    // Observability Errors
    // =========================================================================
    /// Statistic gauge could not be registered
    #[error("Failed to register metric {name}: {source}")]
    MetricsRegistration {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Violations carried by an `InvalidConfiguration` error, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            Error::InvalidConfiguration(violations) => violations,
            _ => &[],
        }
    }
}
