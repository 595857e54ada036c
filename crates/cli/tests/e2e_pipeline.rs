//! End-to-end tests for the finrag pipeline.
//!
//! These exercise the full flow from a user query to the returned answer
//! over a JSONL index on disk, with scripted providers standing in for the
//! model API.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use finrag_config::{AppConfig, CompressionConfig, GenerationConfig};
use finrag_core::error::ProviderError;
use finrag_core::memory::CompressedMemory;
use finrag_core::message::{ConversationTurn, TurnHistory};
use finrag_core::profile::{FinancialProfile, ProfileSnapshot};
use finrag_core::provider::{
    EmbeddingProvider, GenerationProvider, GenerationRequest, GenerationResult,
};
use finrag_index::{IndexRecord, JsonlIndex};
use finrag_providers::ResilientCaller;
use finrag_rag::{AnswerGenerator, HistoryCompressor, Pipeline, PromptAssembler};
use tokio_util::sync::CancellationToken;

// ── Scripted providers ───────────────────────────────────────────────────

/// Returns scripted responses in sequence; rate limits once they run out.
struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn always_rate_limited() -> Self {
        Self::new(&[])
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, n: usize) -> String {
        self.prompts.lock().unwrap()[n].clone()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        match self.responses.lock().unwrap().pop_front() {
            Some(text) => Ok(GenerationResult { text }),
            None => Err(ProviderError::RateLimited {
                retry_after_secs: None,
            }),
        }
    }
}

/// Embeds text as a lowercase letter histogram.
struct LetterEmbedder;

impl LetterEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            v[(c - b'a') as usize] += 1.0;
        }
        v
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(Self::vector(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const KYC_CHUNKS: [(&str, &str); 2] = [
    (
        "Banks must complete KYC by verifying identity and address documents.",
        "rbi-kyc-master-direction.pdf",
    ),
    (
        "Non-resident Indians may submit an overseas address as proof for KYC.",
        "rbi-kyc-master-direction.pdf",
    ),
];

fn write_index(chunks: &[(&str, &str)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for (text, source) in chunks {
        let record = IndexRecord::chunk(*text, *source, LetterEmbedder::vector(text));
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }
    // A partially written line from an interrupted ingestion run.
    writeln!(file, "{{\"id\": \"broken\", \"embed").unwrap();
    file
}

fn pipeline(generator: Arc<ScriptedProvider>, index_file: &tempfile::NamedTempFile) -> Pipeline {
    Pipeline::new(
        generator,
        Arc::new(LetterEmbedder),
        Arc::new(JsonlIndex::open(index_file.path()).unwrap()),
        &AppConfig::default(),
    )
}

fn kyc_history() -> TurnHistory {
    TurnHistory::new(vec![
        ConversationTurn::user("What are RBI KYC norms?"),
        ConversationTurn::assistant("Banks verify identity and address [CHUNK 1]."),
    ])
}

fn profile() -> FinancialProfile {
    serde_json::from_value(serde_json::json!({
        "user": {
            "name": "Ravi", "age": 38, "gender": "male", "city": "Bengaluru",
            "state": "KA", "country": "India", "maritalStatus": "married",
            "dependents": 2, "employmentType": "salaried", "annualIncome": 2400000.0,
            "riskProfile": "moderate"
        },
        "income": [{"sourceType": "salary", "monthlyAmount": 200000.0}],
        "expense": [{"category": "household", "monthlyAmount": 90000.0}],
        "liability": [{"type": "home_loan", "outstandingAmount": 4000000.0, "emiAmount": 45000.0}]
    }))
    .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn retrieve_context_without_history() {
    let index_file = write_index(&KYC_CHUNKS);
    let generator = Arc::new(ScriptedProvider::new(&[]));
    let pipeline = pipeline(generator.clone(), &index_file);

    let result = pipeline
        .retrieve_context("What are RBI KYC norms?", None, Some(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.chunks.len(), 2);
    assert!((1..=2).contains(&result.sources.len()));
    assert_eq!(result.search_query, "What are RBI KYC norms?");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn follow_up_question_is_rewritten() {
    let index_file = write_index(&KYC_CHUNKS);
    let generator = Arc::new(ScriptedProvider::new(&[
        "What are RBI KYC norms for NRIs?",
        "NRIs may use an overseas address as KYC proof [CHUNK 1].",
    ]));
    let pipeline = pipeline(generator.clone(), &index_file);

    let result = pipeline
        .answer("What about for NRIs?", Some(&kyc_history()), &CancellationToken::new())
        .await
        .unwrap();

    let rewritten = result.rewritten_query.expect("follow-up should be rewritten");
    assert_ne!(rewritten, "What about for NRIs?");
    assert_eq!(rewritten, "What are RBI KYC norms for NRIs?");
    assert!(result.answer.contains("[CHUNK 1]"));
    assert!(generator.prompt(0).contains("User: What are RBI KYC norms?"));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_provider_fallback_and_propagation() {
    let provider = Arc::new(ScriptedProvider::always_rate_limited());
    let snapshot = ProfileSnapshot::new("Name: Ravi | Age: 38 | Monthly income: ₹2,00,000");

    let compressor = HistoryCompressor::new(
        provider.clone(),
        ResilientCaller::default(),
        CompressionConfig::default(),
    );
    let memory = compressor
        .compress(
            None,
            "Should I prepay my home loan?",
            "Keep six months of expenses liquid first.",
            &snapshot,
            &CancellationToken::new(),
        )
        .await;
    assert!(memory.as_str().contains(snapshot.as_str()));
    assert!(memory.as_str().contains("User asked: Should I prepay my home loan?"));
    assert_eq!(provider.calls(), 3);

    let generator = AnswerGenerator::new(
        provider.clone(),
        ResilientCaller::default(),
        PromptAssembler::default(),
        GenerationConfig::default(),
    );
    let started = tokio::time::Instant::now();
    let err = generator
        .generate("What is KYC?", &["KYC is mandatory.".to_string()], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(provider.calls(), 6);
    assert_eq!(started.elapsed().as_secs(), 6);
}

#[tokio::test]
async fn retrieval_is_idempotent() {
    let index_file = write_index(&KYC_CHUNKS);
    let pipeline = pipeline(Arc::new(ScriptedProvider::new(&[])), &index_file);
    let cancel = CancellationToken::new();

    let first = pipeline
        .retrieve_context("KYC address proof", None, None, &cancel)
        .await
        .unwrap();
    let second = pipeline
        .retrieve_context("KYC address proof", None, None, &cancel)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn personalized_memory_carries_across_turns() {
    let index_file = write_index(&KYC_CHUNKS);
    let generator = Arc::new(ScriptedProvider::new(&[
        // turn 1: answer, compression
        "Build an emergency fund before prepaying.",
        "**PROFILE SUMMARY**: Ravi, 38, home loan EMI ₹45,000",
        // turn 2: rewrite, answer, compression
        "How much emergency fund does Ravi need before prepaying the home loan?",
        "About ₹5,40,000, six months of expenses.",
        "**PROFILE SUMMARY**: Ravi, 38, target fund ₹5,40,000",
    ]));
    let pipeline = pipeline(generator.clone(), &index_file);
    let profile = profile();
    let cancel = CancellationToken::new();

    let first = pipeline
        .answer_personalized_for(
            &profile,
            "Should I prepay my home loan?",
            None,
            TurnHistory::empty(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(first.answer, "Build an emergency fund before prepaying.");
    assert_eq!(generator.calls(), 2);

    let turns = TurnHistory::new(vec![
        ConversationTurn::user("Should I prepay my home loan?"),
        ConversationTurn::assistant(first.answer.clone()),
    ]);
    let second = pipeline
        .answer_personalized_for(
            &profile,
            "How big should it be?",
            Some(first.new_compressed_memory.clone()),
            turns,
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(second.answer, "About ₹5,40,000, six months of expenses.");
    assert_eq!(
        second.new_compressed_memory,
        CompressedMemory::new("**PROFILE SUMMARY**: Ravi, 38, target fund ₹5,40,000")
    );
    let answer_prompt = generator.prompt(3);
    assert!(answer_prompt.contains("home loan EMI ₹45,000"));
    assert!(answer_prompt.contains("=== USER FINANCIAL PROFILE ==="));
    assert!(answer_prompt.contains("do NOT cite sources"));
}

#[tokio::test]
async fn missing_index_file_yields_empty_context() {
    let dir = tempfile::tempdir().unwrap();
    let index = JsonlIndex::open(dir.path().join("absent.jsonl")).unwrap();
    let generator = Arc::new(ScriptedProvider::new(&["I could not find this in the documents."]));
    let pipeline = Pipeline::new(
        generator.clone(),
        Arc::new(LetterEmbedder),
        Arc::new(index),
        &AppConfig::default(),
    );

    let result = pipeline
        .answer("What is the repo rate?", None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(result.chunks.is_empty());
    assert!(result.sources.is_empty());
    assert_eq!(generator.calls(), 1);
}
