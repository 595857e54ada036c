//! Query embedding and top-k lookup.

use std::collections::BTreeSet;
use std::sync::Arc;

use finrag_core::error::{Error, Result};
use finrag_core::index::VectorIndex;
use finrag_core::message::TurnHistory;
use finrag_core::provider::EmbeddingProvider;
use finrag_core::retrieval::RetrievalResult;
use finrag_providers::ResilientCaller;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::contextualizer::QueryContextualizer;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    contextualizer: QueryContextualizer,
    caller: ResilientCaller,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        contextualizer: QueryContextualizer,
        caller: ResilientCaller,
    ) -> Self {
        Self {
            embedder,
            index,
            contextualizer,
            caller,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Contextualize (when there is history), embed, and fetch `top_k` matches.
    ///
    /// Matches without a `text` string contribute no chunk; every match with a
    /// `source` string contributes to `sources`. Embedding and index failures
    /// propagate.
    pub async fn retrieve(
        &self,
        query: &str,
        history: &TurnHistory,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        let search_query = if history.is_empty() {
            query.to_string()
        } else {
            self.contextualizer
                .contextualize(query, history, cancel)
                .await
        };

        let vector = self
            .caller
            .call("embed_query", cancel, || self.embedder.embed_query(&search_query))
            .await?;

        let matches = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = self.index.query(&vector, top_k) => r?,
        };

        let mut chunks = Vec::with_capacity(matches.len());
        let mut sources = BTreeSet::new();
        for m in matches.iter().take(top_k) {
            if let Some(text) = m.text() {
                chunks.push(text.to_string());
            }
            if let Some(source) = m.source() {
                sources.insert(source.to_string());
            }
        }

        debug!(index = %self.index.name(), matches = matches.len(), "Index queried");
        info!(
            chunks = chunks.len(),
            sources = sources.len(),
            rewritten = search_query != query,
            "Context retrieved"
        );

        Ok(RetrievalResult {
            search_query,
            chunks,
            sources,
        })
    }
}
