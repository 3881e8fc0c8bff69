//! Vector storage
//!
//! Two backends implement [`VectorStore`]:
//! - [`SqliteVectorStore`]: an on-disk collection under `persist_dir`
//! - [`QdrantStore`]: a remote Qdrant collection

mod payload;
mod qdrant;
mod sqlite;

pub use payload::*;
pub use qdrant::*;
pub use sqlite::*;

use crate::config::{Config, VectorStoreBackend};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// A persistent collection of embedded nodes
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist; error if it exists with another dimension
    async fn ensure_collection(&self) -> Result<()>;

    /// Vector size of the existing collection; `None` when it does not exist yet
    async fn stored_dimension(&self) -> Result<Option<usize>>;

    /// Drop every point and recreate the collection
    async fn reset(&self) -> Result<()>;

    /// Insert or replace points by id
    async fn upsert(&self, points: Vec<NodePoint>) -> Result<()>;

    /// Delete points by id; unknown ids are ignored
    async fn delete(&self, ids: &[Uuid]) -> Result<()>;

    /// Most similar nodes, highest score first
    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredNode>>;

    /// Number of points in the collection
    async fn count(&self) -> Result<usize>;

    fn collection(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// Open the configured vector store backend; the collection is created or
/// migrated by the index build
pub async fn open_store(config: &Config, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.vector_store_backend()? {
        VectorStoreBackend::Sqlite => Arc::new(
            SqliteVectorStore::open(
                &config.vectors_db_path(),
                &config.collection_name,
                dimension,
            )
            .await?,
        ),
        VectorStoreBackend::Qdrant => Arc::new(
            QdrantStore::new(
                &config.vector_store.qdrant_url,
                &config.collection_name,
                dimension,
            )
            .await?,
        ),
    };
    Ok(store)
}

/// Vector dimension check shared by the backends
pub(crate) fn check_dimensions(
    collection: &str,
    expected: usize,
    points: &[NodePoint],
) -> std::result::Result<(), String> {
    match points.iter().find(|p| p.vector.len() != expected) {
        Some(mismatch) => Err(format!(
            "Vector dimension mismatch for collection '{}': expected {} (got {})",
            collection,
            expected,
            mismatch.vector.len()
        )),
        None => Ok(()),
    }
}
