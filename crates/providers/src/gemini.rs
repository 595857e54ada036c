//! Google Gemini provider (Generative Language API).
//!
//! Generation uses `generateContent`. Embeddings are asymmetric: queries are
//! embedded with the `RETRIEVAL_QUERY` task type and stored documents with
//! `RETRIEVAL_DOCUMENT` via `batchEmbedContents`.

use async_trait::async_trait;
use finrag_core::error::ProviderError;
use finrag_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        generation_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            generation_model: generation_model.into(),
            embedding_model: embedding_model.into(),
            client: http::client(Duration::from_secs(120)),
        }
    }

    /// Point at a different endpoint (proxy, regional host, test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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

    fn embed_request(&self, text: &str, mode: EmbeddingMode) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            },
            task_type: task_type(mode),
        }
    }
}

fn task_type(mode: EmbeddingMode) -> &'static str {
    match mode {
        EmbeddingMode::Query => "RETRIEVAL_QUERY",
        EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResult, ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some(request.prompt),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        };

        debug!(
            model = %self.generation_model,
            max_output_tokens = request.max_output_tokens,
            "Sending generateContent request"
        );

        let url = self.model_url(&self.generation_model, "generateContent");
        let response: GenerateResponse = self.post(&url, &body).await?;
        let text = response.text().ok_or(ProviderError::EmptyResponse)?;
        Ok(GenerationResult { text })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models/{}", self.base_url, self.generation_model);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(http::transport_error)?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed_query(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let body = self.embed_request(text, EmbeddingMode::Query);
        let url = self.model_url(&self.embedding_model, "embedContent");
        let response: EmbedResponse = self.post(&url, &body).await?;
        if response.embedding.values.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(response.embedding.values)
    }

    async fn embed_documents(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| self.embed_request(t, EmbeddingMode::Document))
                .collect(),
        };

        debug!(count = texts.len(), model = %self.embedding_model, "Sending batch embedding request");

        let url = self.model_url(&self.embedding_model, "batchEmbedContents");
        let response: BatchEmbedResponse = self.post(&url, &body).await?;
        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            });
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

// --- Gemini API types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}
