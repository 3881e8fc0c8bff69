//! Metadata storage using SQLite
//!
//! Tracks which documents (by content hash) and which chunks (by vector
//! store point id) each collection already holds, so an index build only
//! embeds what changed.

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::{debug, info};

/// A document already present in a collection
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub collection: String,
    pub path: String,
    pub title: Option<String>,
    pub content_hash: String,
    pub updated_at: String,
}

impl DocumentRecord {
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        path: impl Into<String>,
        title: Option<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            path: path.into(),
            title,
            content_hash: content_hash.into(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A chunk of a document and the point holding its vector
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_index: i64,
    pub point_id: String,
    pub chunk_hash: String,
}

/// Embedding model a collection was built with
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub embedding_model: String,
    pub dimension: i64,
    pub created_at: String,
}

/// Row counts for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaStats {
    pub documents: usize,
    pub chunks: usize,
    pub points: usize,
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the metadata database under `persist_dir`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.metadata_db_path()).await
    }

    /// Open (creating if needed) a metadata database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to metadata database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        debug!("Initializing metadata schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    // ===== Collection Operations =====

    pub async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let info = sqlx::query_as::<_, CollectionInfo>("SELECT * FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(info)
    }

    pub async fn set_collection(
        &self,
        name: &str,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (name, embedding_model, dimension, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                embedding_model = excluded.embedding_model,
                dimension = excluded.dimension
            "#,
        )
        .bind(name)
        .bind(embedding_model)
        .bind(dimension as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Forget every document and chunk of a collection
    pub async fn reset_collection(&self, name: &str) -> Result<()> {
        info!(collection = name, "Resetting collection metadata");
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // ===== Document Operations =====

    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Option<DocumentRecord>> {
        let doc = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    pub async fn list_documents(&self, collection: &str) -> Result<Vec<DocumentRecord>> {
        let docs = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE collection = ? ORDER BY path",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    /// Record a document together with its complete chunk list
    pub async fn replace_document(&self, doc: &DocumentRecord, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, path, title, content_hash, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                path = excluded.path,
                title = excluded.title,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.collection)
        .bind(&doc.path)
        .bind(&doc.title)
        .bind(&doc.content_hash)
        .bind(&doc.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE collection = ? AND doc_id = ?")
            .bind(&doc.collection)
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (collection, doc_id, chunk_index, point_id, chunk_hash)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&doc.collection)
            .bind(&doc.id)
            .bind(chunk.chunk_index)
            .bind(&chunk.point_id)
            .bind(&chunk.chunk_hash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a document, returning the point ids it referenced
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<Vec<String>> {
        let point_ids = self.point_ids(collection, id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE collection = ? AND doc_id = ?")
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(point_ids)
    }

    // ===== Chunk Operations =====

    /// Distinct point ids referenced by one document
    pub async fn point_ids(&self, collection: &str, doc_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT point_id FROM chunks WHERE collection = ? AND doc_id = ? ORDER BY point_id",
        )
        .bind(collection)
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn stats(&self, collection: &str) -> Result<MetaStats> {
        let documents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        let points: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT point_id) FROM chunks WHERE collection = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;

        Ok(MetaStats {
            documents: documents as usize,
            chunks: chunks as usize,
            points: points as usize,
        })
    }
}
