//! Snapshot extraction — the inverse of seeding.
//!
//! Dumps every known collection from the store to its pretty-printed JSON
//! snapshot file, shallow (field values exactly as stored, no relational
//! expansion) and capped at [`FETCH_LIMIT`](crate::store::FETCH_LIMIT)
//! documents per collection. No ID remapping happens here: snapshot IDs are
//! whatever the store currently assigns, and translation is the seed side's
//! job. Media binaries owned by the store are copied alongside.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::config::Config;
use crate::models::Collection;
use crate::snapshot;
use crate::store::{Store, StoredDocument};

pub async fn run_extract(config: &Config) -> Result<()> {
    snapshot::ensure_dirs(config)?;
    let store = Store::open(config).await?;

    println!("extract");
    for collection in Collection::ALL {
        let docs = store.fetch_collection(collection).await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in &docs {
            if collection == Collection::Media {
                copy_media_binary(config, &store, doc);
            }
            out.push(snapshot_document(doc));
        }
        snapshot::write_snapshot(config, collection, &out)?;
        println!("  {}: {} documents", collection, out.len());
    }

    store.close().await;
    println!("ok");
    Ok(())
}

/// Composes one snapshot object: `id` first, then the stored fields, then
/// the timestamps the seeder will strip on the way back in.
fn snapshot_document(doc: &StoredDocument) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("id".to_string(), Value::from(doc.id));
    if let Value::Object(data) = &doc.data {
        for (key, value) in data {
            fields.insert(key.clone(), value.clone());
        }
    }
    if let Some(filename) = &doc.filename {
        fields
            .entry("filename".to_string())
            .or_insert_with(|| Value::from(filename.clone()));
    }
    fields.insert("createdAt".to_string(), Value::from(rfc3339(doc.created_at)));
    fields.insert("updatedAt".to_string(), Value::from(rfc3339(doc.updated_at)));
    Value::Object(fields)
}

fn rfc3339(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

/// Best effort: a media row whose binary has gone missing still extracts,
/// it just has nothing to copy.
fn copy_media_binary(config: &Config, store: &Store, doc: &StoredDocument) {
    let Some(filename) = &doc.filename else {
        return;
    };
    match store.read_media(filename) {
        Ok(Some(bytes)) => {
            if let Err(e) = snapshot::write_image(config, filename, &bytes) {
                eprintln!("warning: failed to copy media binary '{}': {:#}", filename, e);
            }
        }
        Ok(None) => {
            eprintln!("warning: media binary '{}' missing from store", filename);
        }
        Err(e) => {
            eprintln!("warning: failed to read media binary '{}': {:#}", filename, e);
        }
    }
}
