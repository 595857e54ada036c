//! Provider selection: builds the generation and embedding providers named
//! by the configuration.

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use finrag_config::AppConfig;
use finrag_core::error::ProviderError;
use finrag_core::provider::{EmbeddingProvider, GenerationProvider};
use std::sync::Arc;
use std::time::Duration;

/// The long-lived provider handles shared by every request.
#[derive(Clone)]
pub struct Providers {
    pub generation: Arc<dyn GenerationProvider>,
    pub embedding: Arc<dyn EmbeddingProvider>,
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Providers, ProviderError> {
    let settings = &config.provider;
    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let kind = settings.kind.as_str();

    let api_key = match (&config.api_key, kind) {
        (Some(key), _) => key.clone(),
        (None, "ollama" | "vllm" | "llamacpp") => String::new(),
        (None, _) => {
            return Err(ProviderError::NotConfigured(format!(
                "No API key for provider '{kind}'. Set FINRAG_API_KEY or api_key in config.toml"
            )));
        }
    };

    if kind == "gemini" {
        let mut provider = GeminiProvider::new(
            api_key,
            &settings.generation_model,
            &settings.embedding_model,
        )
        .with_timeout(timeout);
        if let Some(url) = &settings.api_url {
            provider = provider.with_base_url(url);
        }
        let provider = Arc::new(provider);
        return Ok(Providers {
            generation: provider.clone(),
            embedding: provider,
        });
    }

    let base_url = settings
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(kind));
    let provider = Arc::new(
        OpenAiCompatProvider::new(kind, base_url, api_key)
            .with_models(&settings.generation_model, &settings.embedding_model)
            .with_timeout(timeout),
    );
    Ok(Providers {
        generation: provider.clone(),
        embedding: provider,
    })
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
