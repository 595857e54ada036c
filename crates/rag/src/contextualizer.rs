//! Follow-up query rewriting.

use std::sync::Arc;

use finrag_core::message::TurnHistory;
use finrag_core::provider::{GenerationProvider, GenerationRequest};
use finrag_providers::ResilientCaller;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::budget::GenerationBudget;
use crate::prompt::PromptAssembler;

/// Rewrites a context-dependent follow-up into a standalone query.
///
/// Never fails: any provider error, including rate-limit exhaustion and
/// cancellation, yields the original query.
pub struct QueryContextualizer {
    provider: Arc<dyn GenerationProvider>,
    caller: ResilientCaller,
    assembler: PromptAssembler,
    window: usize,
    budget: GenerationBudget,
}

impl QueryContextualizer {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        caller: ResilientCaller,
        assembler: PromptAssembler,
        window: usize,
        budget: GenerationBudget,
    ) -> Self {
        Self {
            provider,
            caller,
            assembler,
            window,
            budget,
        }
    }

    /// Only the last `window` turns of `history` are shown to the model.
    pub async fn contextualize(
        &self,
        query: &str,
        history: &TurnHistory,
        cancel: &CancellationToken,
    ) -> String {
        if history.is_empty() {
            return query.to_string();
        }

        let recent = history.recent(self.window);
        let prompt = self.assembler.contextualize(query, recent);
        let request = GenerationRequest::new(
            prompt,
            self.budget.max_output_tokens,
            self.budget.temperature,
        );

        let result = self
            .caller
            .call("contextualize", cancel, || self.provider.generate(request.clone()))
            .await;

        match result {
            Ok(r) => {
                let rewritten = r.text.trim();
                if rewritten.is_empty() {
                    query.to_string()
                } else {
                    debug!(original = %query, rewritten = %rewritten, "Query contextualized");
                    rewritten.to_string()
                }
            }
            Err(e) => {
                warn!(error = %e, "Contextualization failed, using original query");
                query.to_string()
            }
        }
    }
}
