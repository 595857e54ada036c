//! Conversation memory compression.
//!
//! Merges the previous memory, the latest exchange, and the profile snapshot
//! into a new memory string. If the model cannot be used, a deterministic
//! truncation takes its place, so compression itself never fails.

use std::sync::Arc;

use finrag_config::CompressionConfig;
use finrag_core::memory::{CompressedMemory, MemorySection};
use finrag_core::profile::ProfileSnapshot;
use finrag_core::provider::{GenerationProvider, GenerationRequest};
use finrag_providers::ResilientCaller;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::prompt::PromptAssembler;

pub struct HistoryCompressor {
    provider: Arc<dyn GenerationProvider>,
    caller: ResilientCaller,
    assembler: PromptAssembler,
    config: CompressionConfig,
}

impl HistoryCompressor {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        caller: ResilientCaller,
        config: CompressionConfig,
    ) -> Self {
        Self {
            provider,
            caller,
            assembler: PromptAssembler::new(config.word_limit),
            config,
        }
    }

    pub async fn compress(
        &self,
        previous: Option<&CompressedMemory>,
        query: &str,
        answer: &str,
        snapshot: &ProfileSnapshot,
        cancel: &CancellationToken,
    ) -> CompressedMemory {
        let prompt = self.assembler.compression(previous, query, answer, snapshot);
        let request = GenerationRequest::new(
            prompt,
            self.config.max_output_tokens,
            self.config.temperature,
        );

        let result = self
            .caller
            .call("compress_history", cancel, || self.provider.generate(request.clone()))
            .await;

        match result {
            Ok(r) if !r.text.trim().is_empty() => {
                let memory = CompressedMemory::new(r.text.trim());
                info!(words = memory.word_count(), "History compressed");
                memory
            }
            Ok(_) => {
                warn!("Compression returned empty text, using fallback");
                self.fallback(query, answer, snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Compression failed, using fallback");
                self.fallback(query, answer, snapshot)
            }
        }
    }

    /// Snapshot verbatim plus truncated query and answer under fixed headers.
    pub fn fallback(&self, query: &str, answer: &str, snapshot: &ProfileSnapshot) -> CompressedMemory {
        let query: String = query.chars().take(self.config.query_excerpt_chars).collect();
        let answer: String = answer.chars().take(self.config.answer_excerpt_chars).collect();
        CompressedMemory::new(format!(
            "{}: {snapshot}\n\n{}:\nUser asked: {query}\n\n{}:\n{answer}",
            MemorySection::ProfileSummary.header(),
            MemorySection::ConversationHighlights.header(),
            MemorySection::AdviceGiven.header(),
        ))
    }
}
