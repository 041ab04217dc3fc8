//! Seeding orchestration.
//!
//! Replays on-disk snapshots into the content store, collection by collection
//! in dependency order, translating relation references through the persisted
//! [`IdMap`]. Deletion failures, missing snapshots, missing binaries, and
//! individual document failures are all non-fatal: they are logged, counted,
//! and the pass moves on. The map is flushed to disk after every collection,
//! so a crash mid-pass loses at most the in-flight collection's mappings.
//!
//! A pass holds an exclusive lock file for its whole duration; concurrent
//! invocations fail up front instead of corrupting the map.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::config::Config;
use crate::idmap::IdMap;
use crate::models::{seed_order, Collection};
use crate::remap::{resolve_relations, ResolveMode};
use crate::snapshot;
use crate::store::{FilePayload, Store};

/// Outcome of one seed pass.
#[derive(Debug)]
pub struct SeedReport {
    pub collections: Vec<CollectionReport>,
}

impl SeedReport {
    /// Names of the collections this pass processed, in order.
    pub fn seeded_names(&self) -> Vec<String> {
        self.collections
            .iter()
            .map(|c| c.collection.name().to_string())
            .collect()
    }
}

/// Per-collection counters for the summary and for callers.
#[derive(Debug)]
pub struct CollectionReport {
    pub collection: Collection,
    pub deleted: u64,
    pub created: u64,
    pub failed: u64,
    pub skipped: bool,
}

/// The map is cleared for a full reseed, or when the single requested
/// collection is media (the root of the dependency graph — every mapping
/// built on top of it is stale once media is recreated). Any other partial
/// pass continues from the persisted map.
fn should_reset(requested: Option<Collection>) -> bool {
    matches!(requested, None | Some(Collection::Media))
}

fn resolve_targets(requested: Option<&str>) -> Result<Vec<Collection>> {
    match requested {
        Some(name) => {
            let collection = Collection::parse(name).ok_or_else(|| {
                let known: Vec<&str> = seed_order().iter().map(|c| c.name()).collect();
                anyhow::anyhow!(
                    "Unknown collection: '{}'. Known: {}",
                    name,
                    known.join(", ")
                )
            })?;
            Ok(vec![collection])
        }
        None => Ok(seed_order()),
    }
}

/// Exclusive guard around a seed pass. The lock file is created with
/// `create_new` and removed on drop; a leftover file from a killed process
/// must be removed manually.
#[derive(Debug)]
struct SeedLock {
    path: PathBuf,
}

impl SeedLock {
    fn acquire(path: PathBuf) -> Result<SeedLock> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(SeedLock { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => bail!(
                "another seed pass appears to be running (lock file {} exists); \
                 remove it if stale",
                path.display()
            ),
            Err(e) => Err(e)
                .with_context(|| format!("failed to create lock file: {}", path.display())),
        }
    }
}

impl Drop for SeedLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Runs a seed pass over one collection or, when `requested` is `None`, all
/// of them in dependency order.
pub async fn run_seed(
    config: &Config,
    requested: Option<&str>,
    dry_run: bool,
) -> Result<SeedReport> {
    let targets = resolve_targets(requested)?;
    let label = requested.unwrap_or("all");

    if dry_run {
        println!("seed {} (dry-run)", label);
        for collection in &targets {
            match snapshot::read_snapshot(config, *collection)? {
                Some(docs) => println!("  {}: {} documents in snapshot", collection, docs.len()),
                None => println!("  {}: no snapshot", collection),
            }
        }
        return Ok(SeedReport {
            collections: Vec::new(),
        });
    }

    snapshot::ensure_dirs(config)?;
    let _lock = SeedLock::acquire(config.snapshots.lock_file())?;

    let single = requested.and_then(Collection::parse);
    let map_path = config.snapshots.id_map_file();
    let mut map = if should_reset(single) {
        IdMap::default()
    } else {
        IdMap::load(&map_path)?
    };

    let store = Store::open(config).await?;
    let mode = config.seed.resolve_mode();

    println!("seed {}", label);
    let mut report = SeedReport {
        collections: Vec::new(),
    };
    for collection in targets {
        let result = seed_collection(config, &store, &mut map, collection, mode).await;
        // Flush after every collection: the crash-resilience boundary.
        map.save(&map_path)?;
        if result.skipped {
            println!("  {}: no snapshot, skipped", result.collection);
        } else {
            println!(
                "  {}: deleted {}, created {}, failed {}",
                result.collection, result.deleted, result.created, result.failed
            );
        }
        report.collections.push(result);
    }
    store.close().await;
    println!("ok");

    Ok(report)
}

async fn seed_collection(
    config: &Config,
    store: &Store,
    map: &mut IdMap,
    collection: Collection,
    mode: ResolveMode,
) -> CollectionReport {
    let mut report = CollectionReport {
        collection,
        deleted: 0,
        created: 0,
        failed: 0,
        skipped: false,
    };

    // Best-effort clear; a failure here still lets creation proceed.
    match store.delete_collection(collection).await {
        Ok(n) => report.deleted = n,
        Err(e) => eprintln!("warning: failed to clear {}: {:#}", collection, e),
    }

    let docs = match snapshot::read_snapshot(config, collection) {
        Ok(Some(docs)) if !docs.is_empty() => docs,
        Ok(_) => {
            report.skipped = true;
            return report;
        }
        Err(e) => {
            eprintln!("warning: unreadable snapshot for {}: {:#}", collection, e);
            report.skipped = true;
            return report;
        }
    };

    for doc in &docs {
        match seed_document(config, store, map, collection, doc, mode).await {
            Ok((old_id, new_id)) => {
                map.insert(collection.name(), old_id, new_id);
                report.created += 1;
            }
            Err(e) => {
                // One bad document never aborts the collection. Its old ID
                // simply stays unmapped.
                eprintln!("warning: failed to seed {} document: {:#}", collection, e);
                report.failed += 1;
            }
        }
    }

    report
}

async fn seed_document(
    config: &Config,
    store: &Store,
    map: &IdMap,
    collection: Collection,
    doc: &Value,
    mode: ResolveMode,
) -> Result<(i64, i64)> {
    let fields = doc
        .as_object()
        .context("snapshot document is not a JSON object")?;
    let old_id = fields
        .get("id")
        .and_then(Value::as_i64)
        .context("snapshot document has no numeric id")?;

    let mut data = fields.clone();
    data.remove("id");
    data.remove("createdAt");
    data.remove("updatedAt");

    let resolved = resolve_relations(&Value::Object(data), map, mode)
        .with_context(|| format!("document {}", old_id))?;

    let payload = if collection == Collection::Media {
        match resolved.get("filename").and_then(Value::as_str) {
            Some(filename) => match snapshot::read_image(config, filename)? {
                Some(bytes) => Some(FilePayload {
                    filename: filename.to_string(),
                    bytes,
                }),
                None => {
                    eprintln!(
                        "warning: media binary '{}' not found, creating document {} without a payload",
                        filename, old_id
                    );
                    None
                }
            },
            None => None,
        }
    } else {
        None
    };

    let new_id = store
        .create_document(collection, &resolved, payload)
        .await
        .with_context(|| format!("failed to create document {} in {}", old_id, collection))?;

    Ok((old_id, new_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedConfig, ServerConfig, SnapshotsConfig, StoreConfig};
    use crate::migrate;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        Config {
            store: StoreConfig {
                path: tmp.path().join("store.sqlite"),
                media_dir: tmp.path().join("store-media"),
            },
            snapshots: SnapshotsConfig {
                data_dir: tmp.path().join("snapshots"),
            },
            seed: SeedConfig::default(),
            server: ServerConfig::default(),
        }
    }

    #[test]
    fn reset_condition() {
        assert!(should_reset(None));
        assert!(should_reset(Some(Collection::Media)));
        assert!(!should_reset(Some(Collection::Chapters)));
        assert!(!should_reset(Some(Collection::Projects)));
    }

    #[test]
    fn targets_resolve_to_dependency_order() {
        assert_eq!(resolve_targets(None).unwrap(), seed_order());
        assert_eq!(
            resolve_targets(Some("chapters")).unwrap(),
            vec![Collection::Chapters]
        );
        let err = resolve_targets(Some("users")).unwrap_err();
        assert!(err.to_string().contains("Unknown collection"));
    }

    #[test]
    fn lock_excludes_and_releases() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".seed.lock");

        let held = SeedLock::acquire(path.clone()).unwrap();
        let err = SeedLock::acquire(path.clone()).unwrap_err();
        assert!(err.to_string().contains("another seed pass"));

        drop(held);
        SeedLock::acquire(path).unwrap();
    }

    #[tokio::test]
    async fn full_pass_resolves_forward_references() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        snapshot::write_snapshot(
            &config,
            Collection::Media,
            &[json!({"id": 42, "filename": "logo.png", "alt": "logo"})],
        )
        .unwrap();
        snapshot::write_snapshot(
            &config,
            Collection::Chapters,
            &[json!({"id": 5, "name": "OUSL", "logoDark": 42, "createdAt": "2024-01-01T00:00:00Z"})],
        )
        .unwrap();

        let report = run_seed(&config, None, false).await.unwrap();
        assert_eq!(report.collections.len(), seed_order().len());

        let map = IdMap::load(&config.snapshots.id_map_file()).unwrap();
        let new_media_id = map.get("media", 42).expect("media 42 mapped");
        let new_chapter_id = map.get("chapters", 5).expect("chapter 5 mapped");

        let store = Store::open(&config).await.unwrap();
        let chapters = store.fetch_collection(Collection::Chapters).await.unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].id, new_chapter_id);
        assert_eq!(chapters[0].data["logoDark"], json!(new_media_id));
        // Timestamp fields were stripped before creation.
        assert!(chapters[0].data.get("createdAt").is_none());
        store.close().await;
    }

    #[tokio::test]
    async fn reseeding_media_is_idempotent_in_count() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        snapshot::write_snapshot(
            &config,
            Collection::Media,
            &[
                json!({"id": 1, "filename": "a.png"}),
                json!({"id": 2, "filename": "b.png"}),
            ],
        )
        .unwrap();

        run_seed(&config, Some("media"), false).await.unwrap();
        run_seed(&config, Some("media"), false).await.unwrap();

        let store = Store::open(&config).await.unwrap();
        assert_eq!(store.count_collection(Collection::Media).await.unwrap(), 2);
        store.close().await;
    }

    #[tokio::test]
    async fn missing_snapshot_skips_and_pass_still_succeeds() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        let report = run_seed(&config, Some("projects"), false).await.unwrap();
        assert!(report.collections[0].skipped);
        assert_eq!(report.collections[0].created, 0);
    }

    #[tokio::test]
    async fn strict_mode_fails_only_the_unresolvable_document() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.seed.on_unmapped = "fail".to_string();
        migrate::run_migrations(&config).await.unwrap();

        snapshot::write_snapshot(
            &config,
            Collection::Chapters,
            &[
                json!({"id": 1, "name": "ok"}),
                json!({"id": 2, "name": "bad", "logoDark": 42}),
            ],
        )
        .unwrap();

        let report = run_seed(&config, Some("chapters"), false).await.unwrap();
        assert_eq!(report.collections[0].created, 1);
        assert_eq!(report.collections[0].failed, 1);

        let map = IdMap::load(&config.snapshots.id_map_file()).unwrap();
        assert!(map.get("chapters", 1).is_some());
        assert!(map.get("chapters", 2).is_none());
    }

    #[tokio::test]
    async fn partial_pass_keeps_earlier_mappings() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        snapshot::write_snapshot(&config, Collection::Media, &[json!({"id": 42, "filename": "x.png"})])
            .unwrap();
        run_seed(&config, Some("media"), false).await.unwrap();
        let media_id = IdMap::load(&config.snapshots.id_map_file())
            .unwrap()
            .get("media", 42)
            .unwrap();

        // A later pass over chapters loads the persisted map instead of
        // resetting it, so the media mapping still resolves.
        snapshot::write_snapshot(&config, Collection::Chapters, &[json!({"id": 5, "logoDark": 42})])
            .unwrap();
        run_seed(&config, Some("chapters"), false).await.unwrap();

        let store = Store::open(&config).await.unwrap();
        let chapters = store.fetch_collection(Collection::Chapters).await.unwrap();
        assert_eq!(chapters[0].data["logoDark"], json!(media_id));
        store.close().await;
    }
}
