//! Answer generation with complexity-based budgeting.

use std::sync::Arc;

use finrag_config::GenerationConfig;
use finrag_core::error::Result;
use finrag_core::provider::{GenerationProvider, GenerationRequest};
use finrag_providers::ResilientCaller;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::budget::{ComplexityClassifier, GenerationBudget, budget_for, estimate_tokens};
use crate::prompt::PromptAssembler;

/// Produces answers. Generation errors always propagate: there is no
/// fallback answer.
pub struct AnswerGenerator {
    provider: Arc<dyn GenerationProvider>,
    caller: ResilientCaller,
    assembler: PromptAssembler,
    classifier: ComplexityClassifier,
    config: GenerationConfig,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        caller: ResilientCaller,
        assembler: PromptAssembler,
        config: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            caller,
            assembler,
            classifier: ComplexityClassifier::from_config(&config),
            config,
        }
    }

    /// Grounded mode: cite-the-chunks answer, budget chosen by `query` complexity.
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[String],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let complexity = self.classifier.classify(query);
        let budget = budget_for(complexity, &self.config);
        let prompt = self.assembler.grounded(query, chunks, complexity);

        info!(
            %complexity,
            max_output_tokens = budget.max_output_tokens,
            chunks = chunks.len(),
            "Generating grounded answer"
        );

        self.run("generate", prompt, budget, cancel).await
    }

    /// Direct mode: the prompt is already complete.
    pub async fn generate_direct(&self, prompt: String, cancel: &CancellationToken) -> Result<String> {
        self.run("generate_direct", prompt, self.config.direct.into(), cancel)
            .await
    }

    async fn run(
        &self,
        operation: &str,
        prompt: String,
        budget: GenerationBudget,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt_tokens = estimate_tokens(&prompt);
        let request = GenerationRequest::new(prompt, budget.max_output_tokens, budget.temperature);

        let result = self
            .caller
            .call(operation, cancel, || self.provider.generate(request.clone()))
            .await;

        match result {
            Ok(r) => {
                info!(operation, prompt_tokens, answer_len = r.text.len(), "Answer generated");
                Ok(r.text.trim().to_string())
            }
            Err(e) => {
                error!(operation, provider = %self.provider.name(), error = %e, "Generation failed");
                Err(e.into())
            }
        }
    }
}
