//! The persisted old-ID to new-ID translation table.
//!
//! One JSON file holds a two-level mapping `{ collection: { old_id: new_id } }`.
//! The map is loaded (or reset) at the start of a seed pass, mutated in memory
//! as documents are created, and flushed to disk after each collection so a
//! crash loses at most the in-flight collection's mappings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Cross-collection ID translation table.
///
/// Old IDs are stored as strings because they are JSON object keys on disk;
/// the accessors take and return `i64`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap(BTreeMap<String, BTreeMap<String, i64>>);

impl IdMap {
    /// Loads the map from disk. A missing file is an empty map, not an error;
    /// an unreadable or malformed file is.
    pub fn load(path: &Path) -> Result<IdMap> {
        if !path.exists() {
            return Ok(IdMap::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ID map: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse ID map: {}", path.display()))
    }

    /// Writes the map as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write ID map: {}", path.display()))
    }

    pub fn insert(&mut self, group: &str, old_id: i64, new_id: i64) {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(old_id.to_string(), new_id);
    }

    pub fn get(&self, group: &str, old_id: i64) -> Option<i64> {
        self.0
            .get(group)
            .and_then(|g| g.get(&old_id.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|g| g.is_empty())
    }
}
