//! In-memory index, useful for testing and small ad-hoc corpora.

use async_trait::async_trait;
use finrag_core::error::IndexError;
use finrag_core::index::{IndexMatch, SOURCE_KEY, TEXT_KEY, VectorIndex};
use finrag_core::provider::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::vector::rank_records;

/// One stored chunk: its embedding plus the metadata returned on a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub id: String,

    pub embedding: Vec<f32>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl IndexRecord {
    /// A record with the standard `text` and `source` metadata keys.
    pub fn chunk(text: impl Into<String>, source: impl Into<String>, embedding: Vec<f32>) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert(TEXT_KEY.into(), serde_json::Value::String(text.into()));
        metadata.insert(SOURCE_KEY.into(), serde_json::Value::String(source.into()));
        Self {
            id: Uuid::new_v4().to_string(),
            embedding,
            metadata,
        }
    }
}

/// An index that keeps every record in a Vec and scans it per query.
pub struct InMemoryIndex {
    records: Arc<RwLock<Vec<IndexRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<IndexRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn insert(&self, mut record: IndexRecord) {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        self.records.write().await.push(record);
    }

    /// Embed `(text, source)` pairs as documents and store them.
    pub async fn add_documents(
        &self,
        embedder: &dyn EmbeddingProvider,
        documents: &[(String, String)],
    ) -> Result<usize, IndexError> {
        let texts: Vec<String> = documents.iter().map(|(t, _)| t.clone()).collect();
        let embeddings = embedder
            .embed_documents(&texts)
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to embed documents: {e}")))?;

        let records: Vec<IndexRecord> = documents
            .iter()
            .zip(embeddings)
            .map(|((text, source), embedding)| IndexRecord::chunk(text, source, embedding))
            .collect();
        let added = records.len();
        self.records.write().await.extend(records);
        Ok(added)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        let records = self.records.read().await;
        rank_records(&records, vector, top_k)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.records.read().await.len())
    }
}
