//! File-backed snapshot reading and writing.
//!
//! One pretty-printed JSON file per collection under the configured data
//! directory, plus extracted media binaries under `images/`. Snapshots are
//! the interchange format between [`extract`](crate::extract) and
//! [`seed`](crate::seed).

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::config::Config;
use crate::models::Collection;

/// Creates the data and image directories if absent.
pub fn ensure_dirs(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.snapshots.data_dir)?;
    std::fs::create_dir_all(config.snapshots.image_dir())?;
    Ok(())
}

/// Rejects filenames that would escape the directory they belong in.
pub fn checked_filename(filename: &str) -> Result<&str> {
    let is_bare = Path::new(filename)
        .file_name()
        .map(|n| n == filename)
        .unwrap_or(false);
    if filename.is_empty() || !is_bare {
        bail!("unsafe media filename: '{}'", filename);
    }
    Ok(filename)
}

/// Reads a collection's snapshot file. `Ok(None)` means the file does not
/// exist, which callers treat as "nothing to seed", not an error.
pub fn read_snapshot(config: &Config, collection: Collection) -> Result<Option<Vec<Value>>> {
    let path = config.snapshots.collection_file(collection);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    let docs: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot: {}", path.display()))?;
    Ok(Some(docs))
}

/// Writes a collection's document array as pretty-printed JSON.
pub fn write_snapshot(config: &Config, collection: Collection, docs: &[Value]) -> Result<()> {
    let path = config.snapshots.collection_file(collection);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(docs)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write snapshot: {}", path.display()))
}

/// Reads a media binary from the image directory. `Ok(None)` means the file
/// is absent; seeding tolerates that and proceeds without a payload.
pub fn read_image(config: &Config, filename: &str) -> Result<Option<Vec<u8>>> {
    let path = config.snapshots.image_dir().join(checked_filename(filename)?);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path)
        .with_context(|| format!("failed to read media binary: {}", path.display()))?;
    Ok(Some(bytes))
}

/// Writes a media binary into the image directory.
pub fn write_image(config: &Config, filename: &str, bytes: &[u8]) -> Result<()> {
    let dir = config.snapshots.image_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(checked_filename(filename)?);
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write media binary: {}", path.display()))
}
