//! Configuration loading, validation, and management for finrag.
//!
//! Loads configuration from `~/.finrag/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.finrag/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the configured provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Embedding / generation provider settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer generation budgets
    #[serde(default)]
    pub generation: GenerationConfig,

    /// History compression settings
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Vector index location
    #[serde(default)]
    pub index: IndexConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("retry", &self.retry)
            .field("retrieval", &self.retrieval)
            .field("generation", &self.generation)
            .field("compression", &self.compression)
            .field("index", &self.index)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// "gemini", or any OpenAI-compatible name ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider_kind() -> String {
    "gemini".into()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_embedding_model() -> String {
    "gemini-embedding-001".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_url: None,
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Upper bound on attempts for any wrapped provider call.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    2
}
fn default_backoff_multiplier() -> u32 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// How many recent turns the contextualizer sees
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_top_k() -> usize {
    7
}
fn default_history_window() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_window: default_history_window(),
        }
    }
}

/// Output budget and temperature for one class of generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Queries shorter than this (in characters) may be classified simple
    #[serde(default = "default_simple_char_threshold")]
    pub simple_char_threshold: usize,

    /// Any of these (case-insensitive substring) makes a query complex
    #[serde(default = "default_complex_keywords")]
    pub complex_keywords: Vec<String>,

    #[serde(default = "default_simple_budget")]
    pub simple: BudgetConfig,

    #[serde(default = "default_complex_budget")]
    pub complex: BudgetConfig,

    /// Personalized answers built from a pre-assembled prompt
    #[serde(default = "default_direct_budget")]
    pub direct: BudgetConfig,

    /// Follow-up query rewriting
    #[serde(default = "default_rewrite_budget")]
    pub rewrite: BudgetConfig,
}

fn default_simple_char_threshold() -> usize {
    50
}
fn default_complex_keywords() -> Vec<String> {
    [
        "explain",
        "compare",
        "analyze",
        "detail",
        "list",
        "requirement",
        "process",
        "difference",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_simple_budget() -> BudgetConfig {
    BudgetConfig {
        max_output_tokens: 50,
        temperature: 0.1,
    }
}
fn default_complex_budget() -> BudgetConfig {
    BudgetConfig {
        max_output_tokens: 1000,
        temperature: 0.7,
    }
}
fn default_direct_budget() -> BudgetConfig {
    BudgetConfig {
        max_output_tokens: 1000,
        temperature: 0.7,
    }
}
fn default_rewrite_budget() -> BudgetConfig {
    BudgetConfig {
        max_output_tokens: 100,
        temperature: 0.0,
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            simple_char_threshold: default_simple_char_threshold(),
            complex_keywords: default_complex_keywords(),
            simple: default_simple_budget(),
            complex: default_complex_budget(),
            direct: default_direct_budget(),
            rewrite: default_rewrite_budget(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default = "default_compression_max_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_compression_temperature")]
    pub temperature: f32,

    /// Soft bound the model is asked to respect
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,

    /// Characters of the query kept by the deterministic fallback
    #[serde(default = "default_query_excerpt")]
    pub query_excerpt_chars: usize,

    /// Characters of the answer kept by the deterministic fallback
    #[serde(default = "default_answer_excerpt")]
    pub answer_excerpt_chars: usize,
}

fn default_compression_max_tokens() -> u32 {
    500
}
fn default_compression_temperature() -> f32 {
    0.2
}
fn default_word_limit() -> usize {
    400
}
fn default_query_excerpt() -> usize {
    200
}
fn default_answer_excerpt() -> usize {
    500
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_compression_max_tokens(),
            temperature: default_compression_temperature(),
            word_limit: default_word_limit(),
            query_excerpt_chars: default_query_excerpt(),
            answer_excerpt_chars: default_answer_excerpt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// JSONL file of `{id, embedding, metadata}` records
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

fn default_index_path() -> PathBuf {
    AppConfig::config_dir().join("index").join("chunks.jsonl")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Requests still running after this are cancelled
    #[serde(default = "default_gateway_timeout")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_gateway_timeout() -> u64 {
    90
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            request_timeout_secs: default_gateway_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.finrag/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `FINRAG_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("FINRAG_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(kind) = std::env::var("FINRAG_PROVIDER") {
            self.provider.kind = kind;
        }

        if let Ok(model) = std::env::var("FINRAG_MODEL") {
            self.provider.generation_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".finrag")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        for (label, budget) in [
            ("generation.simple", g.simple),
            ("generation.complex", g.complex),
            ("generation.direct", g.direct),
            ("generation.rewrite", g.rewrite),
        ] {
            check_temperature(label, budget.temperature)?;
            if budget.max_output_tokens == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{label}.max_output_tokens must be > 0"
                )));
            }
        }

        check_temperature("compression", self.compression.temperature)?;
        if self.compression.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "compression.max_output_tokens must be > 0".into(),
            ));
        }

        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(ConfigError::ValidationError(format!(
                "retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn check_temperature(label: &str, temperature: f32) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::ValidationError(format!(
            "{label}.temperature must be between 0.0 and 2.0"
        )));
    }
    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderSettings::default(),
            retry: RetryConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            compression: CompressionConfig::default(),
            index: IndexConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.kind, "gemini");
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_secs, 2);
        assert_eq!(config.generation.simple.max_output_tokens, 50);
        assert_eq!(config.generation.complex.max_output_tokens, 1000);
        assert_eq!(config.generation.complex_keywords.len(), 8);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.kind, config.provider.kind);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.generation.simple, config.generation.simple);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.complex.temperature = 5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("generation.complex"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn attempts_above_three_rejected() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 6;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.max_attempts"));

        config.retry.max_attempts = MAX_RETRY_ATTEMPTS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.kind, "gemini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[provider]
kind = "openai"
generation_model = "gpt-4o-mini"

[retrieval]
top_k = 5

[generation.simple]
max_output_tokens = 80
temperature = 0.0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider.kind, "openai");
        assert_eq!(config.provider.generation_model, "gpt-4o-mini");
        assert_eq!(config.provider.embedding_model, "gemini-embedding-001");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.history_window, 3);
        assert_eq!(config.generation.simple.max_output_tokens, 80);
        assert_eq!(config.generation.complex.max_output_tokens, 1000);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "retrieval = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("8000"));
    }
}
