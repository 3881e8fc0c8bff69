//! Qdrant vector database backend

use super::{check_dimensions, json_from_qdrant_value, Node, NodePoint, ScoredNode, VectorStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, GetCollectionInfoResponse, PointId,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a store handle; no request is made until the first operation
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    async fn collection_vector_size(&self) -> Result<Option<u64>> {
        let info = self.client.collection_info(&self.collection).await?;
        extract_vector_size(&info)
    }

    async fn create_collection(&self) -> Result<()> {
        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        if !self.client.collection_exists(&self.collection).await? {
            return self.create_collection().await;
        }

        debug!("Collection {} already exists", self.collection);
        if let Some(size) = self.collection_vector_size().await? {
            if size as usize != self.dimension {
                return Err(Error::Qdrant(format!(
                    "Collection '{}' has vector size {}, but the embedding model produces {}. Remediation: set a new collection name or reindex with the expected dimension.",
                    self.collection, size, self.dimension
                )));
            }
        }
        Ok(())
    }

    async fn stored_dimension(&self) -> Result<Option<usize>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(None);
        }
        Ok(self.collection_vector_size().await?.map(|size| size as usize))
    }

    async fn reset(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }
        self.create_collection().await
    }

    async fn upsert(&self, points: Vec<NodePoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        check_dimensions(&self.collection, self.dimension, &points).map_err(Error::Qdrant)?;

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<PointStruct> = points.iter().map(|p| p.to_point_struct()).collect();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, point_structs))
            .await?;
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

        let ids: Vec<PointId> = ids.iter().map(|id| PointId::from(id.to_string())).collect();
        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(ids))
            .await?;
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredNode>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, limit as u64).with_payload(true),
            )
            .await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let map: Map<String, Value> = point
                .payload
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect();
            match Node::from_payload(map) {
                Some(node) => results.push(ScoredNode {
                    node,
                    score: point.score,
                }),
                None => warn!("Skipping point with unreadable payload in {}", self.collection),
            }
        }
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }
        let info = self.client.collection_info(&self.collection).await?;
        let points = info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0);
        Ok(points as usize)
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Result<Option<u64>> {
    let config = info
        .result
        .as_ref()
        .and_then(|r| r.config.as_ref())
        .and_then(|c| c.params.as_ref())
        .and_then(|p| p.vectors_config.as_ref())
        .and_then(|v| v.config.as_ref());

    match config {
        Some(qdrant_client::qdrant::vectors_config::Config::Params(params)) => Ok(Some(params.size)),
        Some(qdrant_client::qdrant::vectors_config::Config::ParamsMap(_)) => Err(Error::Qdrant(
            "Collections with named vectors are not supported".to_string(),
        )),
        None => Ok(None),
    }
}
