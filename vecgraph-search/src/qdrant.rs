//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Qdrant point ids must be unsigned integers or UUIDs. Document ids that
//! are neither are mapped to a name-based UUID, and the original id travels
//! in the `doc_id` payload field so search hits report it unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecgraph_search::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("docs", 384).await?;
//! store.upsert("docs", &records).await?;
//! let hits = store.search("docs", &query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CollectionInfo, CreateCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::document::{VectorHit, VectorRecord};
use crate::error::{HybridError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// Default gRPC endpoint of a local Qdrant instance.
pub const DEFAULT_URL: &str = "http://localhost:6334";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance. The vector size of each collection is
/// read from the server the first time it is used, remembered, and checked
/// before vectors are sent.
pub struct QdrantVectorStore {
    client: Qdrant,
    dimensions: RwLock<HashMap<String, usize>>,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self::from_client(client))
    }

    /// Create a store from `QDRANT_URL`, falling back to [`DEFAULT_URL`].
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(&url)
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client, dimensions: RwLock::new(HashMap::new()) }
    }

    fn map_err(e: qdrant_client::QdrantError) -> HybridError {
        HybridError::vector_index(BACKEND, e.to_string())
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Vector size configured on the server, `None` for named-vector
    /// collections.
    async fn server_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        let response = self.client.collection_info(collection).await.map_err(Self::map_err)?;
        Ok(response.result.as_ref().and_then(vector_size))
    }

    async fn expected_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        if let Some(&known) = self.dimensions.read().await.get(collection) {
            return Ok(Some(known));
        }
        let fetched = self.server_dimensions(collection).await?;
        if let Some(size) = fetched {
            debug!(collection, dimensions = size, "read qdrant collection vector size");
            self.dimensions.write().await.insert(collection.to_string(), size);
        }
        Ok(fetched)
    }
}

fn vector_size(info: &CollectionInfo) -> Option<usize> {
    let vectors = info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
    match vectors.config.as_ref()? {
        VectorsConfigKind::Params(params) => usize::try_from(params.size).ok(),
        _ => None,
    }
}

fn check_dimensions(expected: Option<usize>, actual: usize) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => {
            Err(HybridError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Map a document id to a Qdrant point id.
fn point_id(id: &str) -> PointId {
    if let Ok(num) = id.parse::<u64>() {
        return num.into();
    }
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.to_string().into(),
        Err(_) => Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string().into(),
    }
}

fn point_id_string(id: &PointId) -> Option<String> {
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
        None => None,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        let exists = collections.collections.iter().any(|c| c.name == name);
        let recorded = if exists {
            let existing = self.server_dimensions(name).await?;
            check_dimensions(existing, dimensions)?;
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            existing.unwrap_or(dimensions)
        } else {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                        dimensions as u64,
                        Distance::Cosine,
                    )),
                )
                .await
                .map_err(Self::map_err)?;
            debug!(collection = name, dimensions, "created qdrant collection");
            dimensions
        };

        self.dimensions.write().await.insert(name.to_string(), recorded);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        if collections.collections.iter().any(|c| c.name == name) {
            self.client.delete_collection(name).await.map_err(Self::map_err)?;
            debug!(collection = name, "deleted qdrant collection");
        }
        self.dimensions.write().await.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let expected = self.expected_dimensions(collection).await?;
        for record in records {
            check_dimensions(expected, record.embedding.len())?;
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                let mut payload_map = serde_json::Map::new();
                payload_map
                    .insert("doc_id".to_string(), serde_json::Value::String(record.id.clone()));
                payload_map
                    .insert("text".to_string(), serde_json::Value::String(record.text.clone()));
                let metadata_obj: serde_json::Map<String, serde_json::Value> = record
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                payload_map.insert("metadata".to_string(), serde_json::Value::Object(metadata_obj));

                let payload =
                    Payload::try_from(serde_json::Value::Object(payload_map)).unwrap_or_default();

                PointStruct::new(point_id(&record.id), record.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = records.len(), "upserted records to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>> {
        let expected = self.expected_dimensions(collection).await?;
        check_dimensions(expected, embedding.len())?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let hits = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .payload
                    .get("doc_id")
                    .and_then(Self::extract_string)
                    .or_else(|| scored.id.as_ref().and_then(point_id_string))
                    .unwrap_or_default();

                let text =
                    scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();

                let metadata: HashMap<String, String> = scored
                    .payload
                    .get("metadata")
                    .and_then(|v| match &v.kind {
                        Some(Kind::StructValue(s)) => Some(
                            s.fields
                                .iter()
                                .filter_map(|(k, v)| {
                                    Self::extract_string(v).map(|s| (k.clone(), s))
                                })
                                .collect(),
                        ),
                        _ => None,
                    })
                    .unwrap_or_default();

                VectorHit { id, score: scored.score, text, metadata }
            })
            .collect();

        Ok(hits)
    }
}
