//! The conversational retrieval-and-generation pipeline.
//!
//! A request flows through:
//!
//! 1. **Contextualize** a follow-up into a standalone query (recent turns only)
//! 2. **Retrieve** the top-k chunks for the embedded query
//! 3. **Assemble** a grounded or personalized prompt
//! 4. **Generate** under a complexity-dependent budget
//! 5. **Compress** memory for the next turn (personalized flow only)
//!
//! Contextualization and compression recover from provider failures on
//! their own; retrieval and generation failures reach the caller.

pub mod budget;
pub mod compressor;
pub mod contextualizer;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

#[cfg(test)]
mod test_helpers;

pub use budget::{ComplexityClassifier, GenerationBudget, QueryComplexity};
pub use compressor::HistoryCompressor;
pub use contextualizer::QueryContextualizer;
pub use generator::AnswerGenerator;
pub use pipeline::{AnswerResult, PersonalizedAnswer, PersonalizedRequest, Pipeline};
pub use prompt::PromptAssembler;
pub use retriever::Retriever;
