//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Groq, and any
//! endpoint exposing `/chat/completions` and `/embeddings`.

use async_trait::async_trait;
use finrag_core::error::ProviderError;
use finrag_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

/// An OpenAI-compatible generation and embedding provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            generation_model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            client: http::client(Duration::from_secs(120)),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn with_models(
        mut self,
        generation_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        self.generation_model = generation_model.into();
        self.embedding_model = embedding_model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Err(http::read_error(response).await);
        }

        response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        let expected = inputs.len();
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
            encoding_format: "float",
        };

        debug!(
            provider = %self.name,
            model = %self.embedding_model,
            count = expected,
            "Sending embedding request"
        );

        let response: EmbeddingApiResponse = self.post("embeddings", &body).await?;
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.len() != expected {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Expected {expected} embeddings, got {}", data.len()),
            });
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResult, ProviderError> {
        let body = ChatRequest {
            model: &self.generation_model,
            messages: vec![ApiMessage {
                role: "user".into(),
                content: Some(request.prompt),
            }],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            stream: false,
        };

        debug!(provider = %self.name, model = %self.generation_model, "Sending completion request");

        let response: ChatResponse = self.post("chat/completions", &body).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(GenerationResult { text })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)
    }

    async fn embed_documents(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed(texts.to_vec()).await
    }
}

// --- OpenAI API types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
