//! The SQLite-backed content store.
//!
//! This is the host side of seeding and extraction: documents live in one
//! `documents` table keyed by collection, media binaries in a store-owned
//! directory. Creating a media document with a payload transfers ownership of
//! the binary to the store.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::models::Collection;
use crate::snapshot::checked_filename;

/// Shallow fetch cap for extraction: at most this many documents per
/// collection, no pagination beyond it.
pub const FETCH_LIMIT: i64 = 1000;

/// A media binary handed to [`Store::create_document`].
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One row of the store, with its JSON fields parsed.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: i64,
    pub data: Value,
    pub filename: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct Store {
    pool: SqlitePool,
    media_dir: PathBuf,
}

impl Store {
    pub async fn open(config: &Config) -> Result<Store> {
        let pool = db::connect(&config.store).await?;
        std::fs::create_dir_all(&config.store.media_dir)?;
        Ok(Store {
            pool,
            media_dir: config.store.media_dir.clone(),
        })
    }

    /// Creates a document and returns its store-assigned ID. A payload, if
    /// present, is written into the store's media directory first.
    pub async fn create_document(
        &self,
        collection: Collection,
        data: &Value,
        payload: Option<FilePayload>,
    ) -> Result<i64> {
        if !data.is_object() {
            bail!("document data must be a JSON object");
        }

        let filename = match &payload {
            Some(p) => {
                let name = checked_filename(&p.filename)?;
                std::fs::write(self.media_dir.join(name), &p.bytes)
                    .with_context(|| format!("failed to store media binary '{}'", name))?;
                Some(p.filename.clone())
            }
            None => None,
        };

        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO documents (collection, data, filename, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection.name())
        .bind(serde_json::to_string(data)?)
        .bind(&filename)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Deletes every document in a collection, returning the count removed.
    pub async fn delete_collection(&self, collection: Collection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(collection.name())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetches up to [`FETCH_LIMIT`] documents in ID order, shallow: field
    /// values come back exactly as stored, with no relational expansion.
    pub async fn fetch_collection(&self, collection: Collection) -> Result<Vec<StoredDocument>> {
        let rows = sqlx::query(
            "SELECT id, data, filename, created_at, updated_at \
             FROM documents WHERE collection = ? ORDER BY id LIMIT ?",
        )
        .bind(collection.name())
        .bind(FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let raw: String = row.get("data");
            let data: Value = serde_json::from_str(&raw)
                .with_context(|| format!("corrupt document {} in {}", id, collection))?;
            docs.push(StoredDocument {
                id,
                data,
                filename: row.get("filename"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }
        Ok(docs)
    }

    pub async fn count_collection(&self, collection: Collection) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Reads a store-owned media binary. `Ok(None)` when absent.
    pub fn read_media(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.media_dir.join(checked_filename(filename)?);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read media binary: {}", path.display()))?;
        Ok(Some(bytes))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
