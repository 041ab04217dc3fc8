use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Collection;
use crate::remap::ResolveMode;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub snapshots: SnapshotsConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// SQLite database file backing the content store.
    pub path: PathBuf,
    /// Directory where the store keeps media binaries it owns.
    pub media_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotsConfig {
    /// Directory holding per-collection snapshot files, extracted images
    /// (under `images/`), and the persisted ID map.
    pub data_dir: PathBuf,
}

impl SnapshotsConfig {
    pub fn collection_file(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.name()))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn id_map_file(&self) -> PathBuf {
        self.data_dir.join("id-map.json")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join(".seed.lock")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    /// What to do with a relation reference whose old ID has no map entry:
    /// `keep` leaves the raw value in place, `fail` rejects the document.
    #[serde(default = "default_on_unmapped")]
    pub on_unmapped: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            on_unmapped: default_on_unmapped(),
        }
    }
}

fn default_on_unmapped() -> String {
    "keep".to_string()
}

impl SeedConfig {
    pub fn resolve_mode(&self) -> ResolveMode {
        // Validated at load time; anything unrecognized falls back to the
        // tolerant default.
        if self.on_unmapped == "fail" {
            ResolveMode::Fail
        } else {
            ResolveMode::Keep
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required by `POST /seed`. Must be non-empty to serve.
    #[serde(default)]
    pub token: String,
    /// Wall-clock budget for one seed pass, in seconds. 0 means unlimited.
    #[serde(default)]
    pub seed_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token: String::new(),
            seed_timeout_secs: 0,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.seed.on_unmapped.as_str() {
        "keep" | "fail" => {}
        other => anyhow::bail!(
            "Unknown seed.on_unmapped value: '{}'. Must be keep or fail.",
            other
        ),
    }

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}
