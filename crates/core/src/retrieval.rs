//! The value produced by one retrieval call.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Chunks and sources from a single top-k lookup.
///
/// `chunks` keeps index rank order so `[CHUNK i]` labels in the prompt
/// line up with relevance. `sources` is a set; its order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The query that was actually embedded
    pub search_query: String,

    pub chunks: Vec<String>,

    pub sources: BTreeSet<String>,
}

impl RetrievalResult {
    /// The rewritten query, only when contextualization changed it.
    pub fn rewritten_query(&self, original: &str) -> Option<&str> {
        (self.search_query != original).then_some(self.search_query.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
