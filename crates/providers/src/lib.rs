//! Embedding and generation provider implementations for finrag.
//!
//! Adapters implement the `finrag_core` provider traits. Every provider call
//! made by the pipeline goes through [`ResilientCaller`], which retries only
//! on rate limiting.

pub mod gemini;
mod http;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{ResilientCaller, RetryPolicy};
pub use router::{Providers, build_from_config};
