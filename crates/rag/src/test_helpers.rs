//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use finrag_core::error::{IndexError, ProviderError};
use finrag_core::index::{IndexMatch, VectorIndex};
use finrag_core::provider::{
    EmbeddingProvider, GenerationProvider, GenerationRequest, GenerationResult,
};
use std::sync::Mutex;

/// A generator that returns a sequence of scripted results.
///
/// Each call returns the next result in the queue and records the request.
/// Panics if more calls are made than results provided.
pub struct ScriptedGenerator {
    results: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(results: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with the next text.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let results = self.results.lock().unwrap();
        let n = requests.len();

        if n >= results.len() {
            panic!(
                "ScriptedGenerator: no more results (call #{}, have {})",
                n,
                results.len()
            );
        }

        requests.push(request);
        results[n].clone().map(|text| GenerationResult { text })
    }
}

/// A generator that is always rate limited.
#[derive(Default)]
pub struct RateLimitedGenerator {
    call_count: Mutex<usize>,
}

impl RateLimitedGenerator {
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl GenerationProvider for RateLimitedGenerator {
    fn name(&self) -> &str {
        "rate_limited_mock"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResult, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        Err(ProviderError::RateLimited {
            retry_after_secs: None,
        })
    }
}

/// Deterministic embedder: byte histogram folded into 8 buckets.
#[derive(Default)]
pub struct StubEmbedder {
    queries: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        for b in text.bytes() {
            v[(b % 8) as usize] += 1.0;
        }
        v
    }

    /// Texts passed to `embed_query`, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn name(&self) -> &str {
        "stub_embedder"
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.queries.lock().unwrap().push(text.to_string());
        Ok(Self::vector(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// An index that returns fixed matches regardless of the query vector.
pub struct FixedIndex {
    matches: Vec<IndexMatch>,
}

impl FixedIndex {
    pub fn new(matches: Vec<serde_json::Value>) -> Self {
        Self {
            matches: matches
                .into_iter()
                .map(|m| IndexMatch {
                    metadata: m.as_object().cloned().unwrap_or_default(),
                    score: None,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    fn name(&self) -> &str {
        "fixed_mock"
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.matches.len())
    }
}

/// An index whose every query fails.
pub struct BrokenIndex;

#[async_trait]
impl VectorIndex for BrokenIndex {
    fn name(&self) -> &str {
        "broken_mock"
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        Err(IndexError::QueryFailed("connection refused".into()))
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Err(IndexError::QueryFailed("connection refused".into()))
    }
}
