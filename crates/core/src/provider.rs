//! Provider traits: the abstraction over embedding and generation backends.
//!
//! A [`GenerationProvider`] turns a prompt into text; an
//! [`EmbeddingProvider`] turns text into vectors. Implementations must be
//! safe to share across concurrent requests; the pipeline never serializes
//! access to them.
//!
//! Implementations: Gemini, OpenAI-compatible endpoints, test stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The complete, self-contained prompt
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
            temperature,
        }
    }
}

/// The text produced by a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
}

/// Which side of retrieval a text is being embedded for.
///
/// Some providers use asymmetric embeddings, so queries and stored
/// documents are embedded with different task hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    Query,
    Document,
}

/// The generation collaborator.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Generate text for a prompt.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResult, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// The embedding collaborator.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// Embed a batch of documents for storage, one vector per input.
    async fn embed_documents(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;
}
