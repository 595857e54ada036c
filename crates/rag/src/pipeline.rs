//! The conversational RAG pipeline.
//!
//! # Flows
//!
//! 1. **retrieve_context**: contextualize → embed → top-k
//! 2. **answer**: retrieve_context → grounded generation with citations
//! 3. **answer_personalized**: retrieve_context → profile-aware generation →
//!    memory compression
//!
//! Every step within a request runs strictly in sequence. The pipeline holds
//! no per-request state; one instance serves all concurrent requests.

use std::collections::BTreeSet;
use std::sync::Arc;

use finrag_config::AppConfig;
use finrag_core::error::{Error, Result};
use finrag_core::index::VectorIndex;
use finrag_core::memory::CompressedMemory;
use finrag_core::message::TurnHistory;
use finrag_core::profile::{FinancialProfile, ProfileSnapshot};
use finrag_core::provider::{EmbeddingProvider, GenerationProvider};
use finrag_core::retrieval::RetrievalResult;
use finrag_providers::{ResilientCaller, RetryPolicy};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compressor::HistoryCompressor;
use crate::contextualizer::QueryContextualizer;
use crate::generator::AnswerGenerator;
use crate::prompt::PromptAssembler;
use crate::retriever::Retriever;

/// Result of the plain RAG flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer: String,
    pub sources: BTreeSet<String>,
    pub chunks: Vec<String>,
    /// Present only when contextualization changed the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
}

/// Input to the personalized flow.
#[derive(Debug, Clone, Default)]
pub struct PersonalizedRequest {
    pub query: String,
    /// Memory returned by the previous turn, if any
    pub compressed_memory: Option<CompressedMemory>,
    /// Multi-line profile block placed in the prompt
    pub profile_context: String,
    /// Single-paragraph facts fed to compression
    pub profile_snapshot: ProfileSnapshot,
    /// Recent raw turns for query contextualization; may be empty
    pub recent_turns: TurnHistory,
}

/// Result of the personalized flow. The caller persists `new_compressed_memory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedAnswer {
    pub answer: String,
    pub new_compressed_memory: CompressedMemory,
}

pub struct Pipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
    compressor: HistoryCompressor,
    assembler: PromptAssembler,
    default_top_k: usize,
}

impl Pipeline {
    /// Build a pipeline from long-lived collaborators.
    pub fn new(
        generation: Arc<dyn GenerationProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: &AppConfig,
    ) -> Self {
        let caller = ResilientCaller::new(RetryPolicy::from_config(&config.retry));
        let assembler = PromptAssembler::new(config.compression.word_limit);

        let contextualizer = QueryContextualizer::new(
            generation.clone(),
            caller.clone(),
            assembler.clone(),
            config.retrieval.history_window,
            config.generation.rewrite.into(),
        );
        let retriever = Retriever::new(embedding, index, contextualizer, caller.clone());
        let generator = AnswerGenerator::new(
            generation.clone(),
            caller.clone(),
            assembler.clone(),
            config.generation.clone(),
        );
        let compressor = HistoryCompressor::new(generation, caller, config.compression.clone());

        Self {
            retriever,
            generator,
            compressor,
            assembler,
            default_top_k: config.retrieval.top_k,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        self.retriever.index()
    }

    /// Retrieve chunks and sources for `query`, rewriting it first when
    /// `history` has turns. `top_k` defaults to the configured value.
    pub async fn retrieve_context(
        &self,
        query: &str,
        history: Option<&TurnHistory>,
        top_k: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        validate_query(query)?;
        let empty = TurnHistory::empty();
        let history = match history {
            Some(h) => {
                h.validate()?;
                h
            }
            None => &empty,
        };
        let top_k = match top_k {
            Some(0) => return Err(Error::InvalidInput("top_k must be > 0".into())),
            Some(k) => k,
            None => self.default_top_k,
        };
        self.retriever.retrieve(query, history, top_k, cancel).await
    }

    /// Plain RAG: grounded answer with `[CHUNK i]` citations.
    pub async fn answer(
        &self,
        query: &str,
        history: Option<&TurnHistory>,
        cancel: &CancellationToken,
    ) -> Result<AnswerResult> {
        let retrieval = self.retrieve_context(query, history, None, cancel).await?;
        let answer = self
            .generator
            .generate(query, &retrieval.chunks, cancel)
            .await?;

        let rewritten_query = retrieval.rewritten_query(query).map(str::to_string);
        info!(
            chunks = retrieval.chunks.len(),
            rewritten = rewritten_query.is_some(),
            "Answer complete"
        );

        Ok(AnswerResult {
            answer,
            sources: retrieval.sources,
            chunks: retrieval.chunks,
            rewritten_query,
        })
    }

    /// Personalized RAG: profile-aware answer plus the next memory value.
    ///
    /// Generation failures propagate; compression failures never do.
    pub async fn answer_personalized(
        &self,
        request: &PersonalizedRequest,
        cancel: &CancellationToken,
    ) -> Result<PersonalizedAnswer> {
        let retrieval = self
            .retrieve_context(&request.query, Some(&request.recent_turns), None, cancel)
            .await?;

        let prompt = self.assembler.personalized(
            &request.query,
            &retrieval.chunks,
            &request.profile_context,
            request.compressed_memory.as_ref(),
        );
        let answer = self.generator.generate_direct(prompt, cancel).await?;

        let new_compressed_memory = self
            .compressor
            .compress(
                request.compressed_memory.as_ref(),
                &request.query,
                &answer,
                &request.profile_snapshot,
                cancel,
            )
            .await;

        info!(
            chunks = retrieval.chunks.len(),
            memory_words = new_compressed_memory.word_count(),
            "Personalized answer complete"
        );

        Ok(PersonalizedAnswer {
            answer,
            new_compressed_memory,
        })
    }

    /// Personalized RAG, deriving the profile block and snapshot from `profile`.
    pub async fn answer_personalized_for(
        &self,
        profile: &FinancialProfile,
        query: &str,
        compressed_memory: Option<CompressedMemory>,
        recent_turns: TurnHistory,
        cancel: &CancellationToken,
    ) -> Result<PersonalizedAnswer> {
        let request = PersonalizedRequest {
            query: query.to_string(),
            compressed_memory,
            profile_context: profile.context_block(),
            profile_snapshot: profile.snapshot(),
            recent_turns,
        };
        self.answer_personalized(&request, cancel).await
    }
}

fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".into()));
    }
    Ok(())
}
