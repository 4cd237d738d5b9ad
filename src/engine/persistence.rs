//! Single-file store
//!
//! One JSON document per region under the configured location, loaded when
//! the region is created and flushed when the engine stops. File names escape
//! the region name byte-wise so that no two regions share a file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::store::StoredEntry;
use crate::error::{Error, Result};

/// File store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    location: PathBuf,
}

impl FileStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// File backing a region. Distinct region names never share a file.
    pub fn region_path(&self, region: &str) -> PathBuf {
        self.location.join(format!("{}.json", encode_file_name(region)))
    }

    /// Entries previously flushed for a region; empty if none were
    pub(crate) fn load(&self, region: &str) -> Result<HashMap<String, StoredEntry>> {
        let path = self.region_path(region);
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read(&path).map_err(|e| persistence_error(&path, e))?;
        let entries: HashMap<String, StoredEntry> =
            serde_json::from_slice(&contents).map_err(|e| persistence_error(&path, e))?;
        debug!(region, entries = entries.len(), "Loaded region from {}", path.display());
        Ok(entries)
    }

    /// Replace the region's file with the given entries
    pub(crate) fn flush(&self, region: &str, entries: Vec<(String, StoredEntry)>) -> Result<()> {
        fs::create_dir_all(&self.location).map_err(|e| persistence_error(&self.location, e))?;

        let path = self.region_path(region);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        let map: HashMap<String, StoredEntry> = entries.into_iter().collect();
        let contents = serde_json::to_vec(&map).map_err(|e| persistence_error(&path, e))?;

        fs::write(&tmp, contents).map_err(|e| persistence_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| persistence_error(&path, e))?;
        debug!(region, entries = map.len(), "Flushed region to {}", path.display());
        Ok(())
    }
}

/// ASCII letters, digits and `-` pass through; every other byte becomes `_XX`
fn encode_file_name(region: &str) -> String {
    let mut encoded = String::with_capacity(region.len());
    for byte in region.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("_{:02X}", byte));
        }
    }
    encoded
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Persistence {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
