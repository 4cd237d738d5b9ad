//! Engine Topology Descriptors
//!
//! What the engine is told to build. The [`resolver`] maps a validated
//! configuration onto one [`EngineDescriptor`]; the engine factory receives it
//! whole, transport parameters included, at construction time.
//!
//! # Decision Table
//!
//! ```text
//! topology    │ clustering            │ transport profile │ security properties
//! ────────────┼───────────────────────┼───────────────────┼────────────────────
//! standalone  │ none (local mode)     │ none              │ none
//! insecure    │ replicated, sync      │ tcp-insecure      │ none
//! clustered   │ replicated, sync      │ tcp-secure        │ auth + encryption
//! ```
//!
//! Persistence, expiration and statistics are orthogonal to the row.

mod resolver;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::CacheTopologyType;

pub use resolver::resolve;

/// Well-known transport property keys
pub mod keys {
    pub const TCP_ADDRESS: &str = "transport.tcp.address";
    pub const TCP_PORT: &str = "transport.tcp.port";
    pub const INITIAL_HOSTS: &str = "transport.tcpping.initial_hosts";

    pub const ENCRYPT_KEY_STORE_NAME: &str = "transport.encrypt.key_store_name";
    pub const ENCRYPT_STORE_PASSWORD: &str = "transport.encrypt.store_password";
    pub const ENCRYPT_ALIAS: &str = "transport.encrypt.alias";

    pub const AUTH_VALUE: &str = "transport.auth.auth_value";
    pub const AUTH_KEYSTORE_PATH: &str = "transport.auth.keystore_path";
    pub const AUTH_KEYSTORE_PASSWORD: &str = "transport.auth.keystore_password";
    pub const AUTH_KEYSTORE_TYPE: &str = "transport.auth.keystore_type";
    pub const AUTH_CERT_ALIAS: &str = "transport.auth.cert_alias";
    pub const AUTH_CIPHER_TYPE: &str = "transport.auth.cipher_type";

    /// Keys whose values must never be printed
    pub(crate) fn is_secret(key: &str) -> bool {
        key.contains("password") || key == AUTH_VALUE
    }
}

// =============================================================================
// Cache-level descriptor
// =============================================================================

/// How entries are distributed between members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Node-local storage
    Local,
    /// Full replication, synchronous
    ReplicatedSync,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Local => write!(f, "local"),
            CacheMode::ReplicatedSync => write!(f, "repl_sync"),
        }
    }
}

/// Entry lifespan policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Entries live until removed
    Never,
    /// Entries expire this long after they are written
    Lifespan(Duration),
}

impl Expiration {
    /// Resolve the configured expiration. Only an absent value means never
    /// expire; a zero duration is a zero lifespan.
    pub fn from_config(expiration: Option<Duration>) -> Self {
        match expiration {
            Some(lifespan) => Expiration::Lifespan(lifespan),
            None => Expiration::Never,
        }
    }

    pub fn lifespan(&self) -> Option<Duration> {
        match self {
            Expiration::Never => None,
            Expiration::Lifespan(lifespan) => Some(*lifespan),
        }
    }

    /// Lifespan in milliseconds, `None` when entries never expire
    pub fn lifespan_millis(&self) -> Option<u64> {
        self.lifespan()
            .map(|l| u64::try_from(l.as_millis()).unwrap_or(u64::MAX))
    }
}

/// State-transfer and replication parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringDescriptor {
    pub mode: CacheMode,
    pub await_initial_transfer: bool,
    pub fetch_in_memory_state: bool,
    /// Handed to the engine, not enforced here
    pub state_transfer_timeout: Duration,
}

/// Per-cache settings applied to every region the engine creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub expiration: Expiration,
    /// Per-region statistics collection; the resolver always enables it
    pub statistics_enabled: bool,
    /// Single-file store location
    pub persistence: Option<PathBuf>,
    pub clustering: Option<ClusteringDescriptor>,
}

impl CacheDescriptor {
    pub fn mode(&self) -> CacheMode {
        self.clustering
            .as_ref()
            .map(|c| c.mode)
            .unwrap_or(CacheMode::Local)
    }
}

// =============================================================================
// Transport descriptor
// =============================================================================

/// Named transport stack the engine should use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProfile {
    /// Authenticated, encrypted stack
    Secure,
    /// Plain stack with no authentication or encryption layers
    Insecure,
}

impl TransportProfile {
    pub fn stack_name(&self) -> &'static str {
        match self {
            TransportProfile::Secure => "tcp-secure",
            TransportProfile::Insecure => "tcp-insecure",
        }
    }
}

impl fmt::Display for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stack_name())
    }
}

/// Ordered transport parameters keyed by [`keys`]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransportProperties(BTreeMap<String, String>);

impl TransportProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for TransportProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| {
                let shown = if keys::is_secret(k) { "<redacted>" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

/// Everything the engine needs to join a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDescriptor {
    pub cluster_name: String,
    pub profile: TransportProfile,
    pub properties: TransportProperties,
}

// =============================================================================
// Engine descriptor
// =============================================================================

/// Complete engine build instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub topology: CacheTopologyType,
    /// `None` for a standalone engine
    pub transport: Option<TransportDescriptor>,
    pub cache: CacheDescriptor,
}

impl EngineDescriptor {
    pub fn is_clustered(&self) -> bool {
        self.transport.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
