//! Vector index over the loaded documents
//!
//! Building the index reconciles the persistent store with the documents
//! on disk:
//! - Unchanged documents (same content hash) are reused without embedding
//! - Changed documents only embed chunks the store does not already hold
//! - Documents no longer on disk are removed from the store

use crate::chunk::chunk_document;
use crate::config::{ChunkConfig, Config};
use crate::embed::{embed_in_batches, Embedder};
use crate::error::Result;
use crate::loader::Document;
use crate::meta::{ChunkRecord, DocumentRecord, MetaDb};
use crate::progress::IndexProgress;
use crate::store::{NodePoint, VectorStore};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use crate::store::{Node, ScoredNode};

/// Options for an index build
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub chunk: ChunkConfig,
    pub batch_size: usize,
    pub show_progress: bool,
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk: config.chunk.clone(),
            batch_size: config.embedding.batch_size,
            show_progress: true,
        }
    }
}

/// Counters describing one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub collection: String,
    pub documents_loaded: usize,
    pub documents_embedded: usize,
    pub documents_reused: usize,
    pub documents_removed: usize,
    pub chunks_embedded: usize,
    pub chunks_reused: usize,
    pub chunks_deleted: usize,
    /// Points in the collection after the build
    pub points: usize,
}

enum DocOutcome {
    Reused,
    Embedded {
        embedded: usize,
        reused: usize,
        deleted: usize,
    },
}

/// Read-only retrieval handle over a built collection
#[derive(Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    /// Wrap an already-built collection
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Build or reuse the index for `documents`
    pub async fn build(
        documents: &[Document],
        store: Arc<dyn VectorStore>,
        meta: &MetaDb,
        embedder: Arc<dyn Embedder>,
        options: &IndexOptions,
    ) -> Result<(Self, IndexStats)> {
        let collection = store.collection().to_string();
        let mut stats = IndexStats {
            collection: collection.clone(),
            documents_loaded: documents.len(),
            ..IndexStats::default()
        };

        reconcile_collection(store.as_ref(), meta, embedder.as_ref()).await?;

        info!(
            collection = %collection,
            documents = documents.len(),
            "Building vector index"
        );

        let progress = IndexProgress::start(documents.len(), options.show_progress);

        for doc in documents {
            match index_document(doc, store.as_ref(), meta, embedder.as_ref(), options).await? {
                DocOutcome::Reused => stats.documents_reused += 1,
                DocOutcome::Embedded {
                    embedded,
                    reused,
                    deleted,
                } => {
                    stats.documents_embedded += 1;
                    stats.chunks_embedded += embedded;
                    stats.chunks_reused += reused;
                    stats.chunks_deleted += deleted;
                }
            }
            progress.document_done(&doc.metadata.file_name);
        }
        progress.finish();

        let current: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        for record in meta.list_documents(&collection).await? {
            if current.contains(record.id.as_str()) {
                continue;
            }
            info!(path = %record.path, "Removing document no longer on disk");
            let point_ids = meta.delete_document(&collection, &record.id).await?;
            let uuids = parse_point_ids(&point_ids);
            stats.chunks_deleted += uuids.len();
            store.delete(&uuids).await?;
            stats.documents_removed += 1;
        }

        stats.points = store.count().await?;

        info!(
            embedded = stats.documents_embedded,
            reused = stats.documents_reused,
            removed = stats.documents_removed,
            points = stats.points,
            "Vector index ready"
        );

        Ok((Self::new(store, embedder), stats))
    }

    /// Retrieve the `top_k` most similar nodes for `query`
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_query(query).await?;
        let nodes = self.store.search(vector, top_k).await?;
        debug!(results = nodes.len(), "Retrieved nodes");
        Ok(nodes)
    }
}

/// Drop stored state that can no longer be trusted
async fn reconcile_collection(
    store: &dyn VectorStore,
    meta: &MetaDb,
    embedder: &dyn Embedder,
) -> Result<()> {
    let collection = store.collection();

    // A collection created for another vector size can't take new points
    if let Some(stored) = store.stored_dimension().await? {
        if stored != store.dimension() {
            warn!(
                collection,
                previous = stored,
                current = store.dimension(),
                "Embedding dimension changed; rebuilding collection"
            );
            store.reset().await?;
            meta.reset_collection(collection).await?;
        }
    }
    store.ensure_collection().await?;

    if let Some(info) = meta.get_collection(collection).await? {
        if info.embedding_model != embedder.model_name()
            || info.dimension as usize != embedder.dimension()
        {
            warn!(
                collection,
                previous = %info.embedding_model,
                current = embedder.model_name(),
                "Embedding model changed; rebuilding collection"
            );
            store.reset().await?;
            meta.reset_collection(collection).await?;
        }
    }

    let expected = meta.stats(collection).await?.points;
    let actual = store.count().await?;
    if expected != actual {
        warn!(
            collection,
            expected, actual, "Vector store and metadata disagree; rebuilding collection"
        );
        store.reset().await?;
        meta.reset_collection(collection).await?;
    }

    meta.set_collection(collection, embedder.model_name(), embedder.dimension())
        .await
}

async fn index_document(
    doc: &Document,
    store: &dyn VectorStore,
    meta: &MetaDb,
    embedder: &dyn Embedder,
    options: &IndexOptions,
) -> Result<DocOutcome> {
    let collection = store.collection();

    if let Some(existing) = meta.get_document(collection, &doc.id).await? {
        if existing.content_hash == doc.content_hash {
            debug!(path = %doc.path.display(), "Document unchanged, skipping");
            return Ok(DocOutcome::Reused);
        }
    }

    let chunks = chunk_document(&doc.parsed, &doc.id, &options.chunk);
    let previous: BTreeSet<String> = meta.point_ids(collection, &doc.id).await?.into_iter().collect();

    let nodes: Vec<Node> = chunks
        .iter()
        .map(|chunk| Node {
            id: Node::point_id(&chunk.hash).to_string(),
            doc_id: doc.id.clone(),
            doc_path: doc.metadata.file_path.clone(),
            file_name: doc.metadata.file_name.clone(),
            title: doc.title().map(str::to_string),
            headings: chunk.headings.clone(),
            chunk_index: chunk.index as i64,
            chunk_hash: chunk.hash.clone(),
            text: chunk.text.clone(),
        })
        .collect();

    // Identical chunks share a point id; embed each once
    let mut seen = HashSet::new();
    let to_embed: Vec<Node> = nodes
        .iter()
        .filter(|n| !previous.contains(&n.id) && seen.insert(n.id.clone()))
        .cloned()
        .collect();
    let reused = nodes
        .iter()
        .filter(|n| previous.contains(&n.id))
        .map(|n| n.id.as_str())
        .collect::<HashSet<_>>()
        .len();

    if !to_embed.is_empty() {
        debug!(
            path = %doc.path.display(),
            chunks = to_embed.len(),
            "Embedding chunks"
        );
        let texts: Vec<String> = to_embed.iter().map(|n| n.text.clone()).collect();
        let vectors = embed_in_batches(embedder, texts, options.batch_size).await?;
        let points: Vec<NodePoint> = to_embed
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(node, vector)| NodePoint { node, vector })
            .collect();
        store.upsert(points).await?;
    }

    let current: BTreeSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let stale: Vec<String> = previous.difference(&current).cloned().collect();

    let record = DocumentRecord::new(
        collection,
        doc.id.clone(),
        doc.metadata.file_path.clone(),
        doc.title().map(str::to_string),
        doc.content_hash.clone(),
    );
    let chunk_records: Vec<ChunkRecord> = nodes
        .iter()
        .map(|n| ChunkRecord {
            chunk_index: n.chunk_index,
            point_id: n.id.clone(),
            chunk_hash: n.chunk_hash.clone(),
        })
        .collect();
    meta.replace_document(&record, &chunk_records).await?;

    let stale_uuids = parse_point_ids(&stale);
    store.delete(&stale_uuids).await?;

    Ok(DocOutcome::Embedded {
        embedded: to_embed.len(),
        reused,
        deleted: stale_uuids.len(),
    })
}

fn parse_point_ids(ids: &[String]) -> Vec<Uuid> {
    ids.iter()
        .filter_map(|id| match Uuid::parse_str(id) {
            Ok(uuid) => Some(uuid),
            Err(_) => {
                warn!("Ignoring malformed point id {}", id);
                None
            }
        })
        .collect()
}
