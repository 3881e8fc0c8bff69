//! On-disk vector store backed by SQLite
//!
//! Vectors are stored as little-endian f32 blobs next to their node JSON.
//! Search is an exact cosine scan over the collection.

use super::{check_dimensions, Node, NodePoint, ScoredNode, VectorStore};
use crate::embed::cosine_similarity;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

const VECTOR_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vector_collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS vectors (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    vector BLOB NOT NULL,
    node_json TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
"#;

/// SQLite vector store handle
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    dimension: usize,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the vector database at `db_path`
    pub async fn open(db_path: &Path, collection: &str, dimension: usize) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Opening vector store at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(VECTOR_SCHEMA_SQL).execute(&pool).await?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self) -> Result<()> {
        match self.stored_dimension().await? {
            Some(size) if size != self.dimension => Err(Error::Store(format!(
                "Collection '{}' has vector size {}, but the embedding model produces {}. Remediation: set a new collection name or delete the persist directory to reindex.",
                self.collection, size, self.dimension
            ))),
            Some(_) => {
                debug!("Collection {} already exists", self.collection);
                Ok(())
            }
            None => {
                info!(
                    "Creating collection {} with dimension {}",
                    self.collection, self.dimension
                );
                sqlx::query("INSERT INTO vector_collections (name, dimension) VALUES (?, ?)")
                    .bind(&self.collection)
                    .bind(self.dimension as i64)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    async fn stored_dimension(&self) -> Result<Option<usize>> {
        let dim: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM vector_collections WHERE name = ?")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dim.map(|d| d as usize))
    }

    async fn reset(&self) -> Result<()> {
        info!("Resetting collection {}", self.collection);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM vectors WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vector_collections WHERE name = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.ensure_collection().await
    }

    async fn upsert(&self, points: Vec<NodePoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        check_dimensions(&self.collection, self.dimension, &points).map_err(Error::Store)?;

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let mut tx = self.pool.begin().await?;
        for point in &points {
            let node_json = serde_json::to_string(&point.node)?;
            sqlx::query(
                r#"
                INSERT INTO vectors (collection, id, vector, node_json)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    vector = excluded.vector,
                    node_json = excluded.node_json
                "#,
            )
            .bind(&self.collection)
            .bind(&point.node.id)
            .bind(encode_vector(&point.vector))
            .bind(node_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!(
            "Deleting {} points from collection {}",
            ids.len(),
            self.collection
        );

        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM vectors WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredNode>> {
        if vector.len() != self.dimension {
            return Err(Error::Store(format!(
                "Query vector has dimension {}, collection '{}' expects {}",
                vector.len(),
                self.collection,
                self.dimension
            )));
        }

        let rows: Vec<(Vec<u8>, String)> =
            sqlx::query_as("SELECT vector, node_json FROM vectors WHERE collection = ?")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for (blob, node_json) in rows {
            let node: Node = match serde_json::from_str(&node_json) {
                Ok(node) => node,
                Err(e) => {
                    warn!("Skipping unreadable node in {}: {}", self.collection, e);
                    continue;
                }
            };
            let stored = decode_vector(&blob);
            scored.push(ScoredNode {
                score: cosine_similarity(&vector, &stored),
                node,
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
