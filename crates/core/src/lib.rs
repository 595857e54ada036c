//! # finrag Core
//!
//! Domain types, collaborator traits, and error definitions for the finrag
//! conversational retrieval pipeline. This crate has **no I/O**; it defines
//! the model that the provider, index, and pipeline crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (embedding model, generation model, vector
//! index) is a trait here. Implementations live in their own crates. This
//! enables:
//! - Swapping providers via configuration
//! - Deterministic stub collaborators in tests
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod index;
pub mod memory;
pub mod message;
pub mod profile;
pub mod provider;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, ProviderError, Result};
pub use index::{IndexMatch, VectorIndex};
pub use memory::{CompressedMemory, MemorySection};
pub use message::{ConversationTurn, Role, TurnHistory};
pub use profile::{FinancialProfile, ProfileSnapshot, ProfileSummary};
pub use provider::{
    EmbeddingMode, EmbeddingProvider, GenerationProvider, GenerationRequest, GenerationResult,
};
pub use retrieval::RetrievalResult;
