//! Vector index trait: nearest-neighbour lookup over stored chunks.
//!
//! The index's internal data structure is its own business; the pipeline
//! only needs the top-k matches for a query vector, each carrying the
//! metadata recorded at ingestion time (`text`, `source`, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Metadata key holding the chunk text.
pub const TEXT_KEY: &str = "text";

/// Metadata key holding the chunk's origin document id.
pub const SOURCE_KEY: &str = "source";

/// A single nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Metadata stored alongside the embedding
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Similarity to the query, when the index reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl IndexMatch {
    /// The chunk text, if present and a string.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get(TEXT_KEY).and_then(|v| v.as_str())
    }

    /// The origin document id, if present and a string.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(|v| v.as_str())
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Return at most `top_k` matches, nearest first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<IndexMatch>, IndexError>;

    /// Number of stored records.
    async fn count(&self) -> std::result::Result<usize, IndexError>;
}
