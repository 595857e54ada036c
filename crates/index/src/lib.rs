//! Vector index implementations for finrag.
//!
//! Both indexes rank stored chunk embeddings by cosine similarity. The
//! JSONL index reads what an external ingestion job wrote; the in-memory
//! index is used for tests and ad-hoc corpora.

pub mod file_backend;
pub mod in_memory;
pub mod vector;

pub use file_backend::JsonlIndex;
pub use in_memory::{InMemoryIndex, IndexRecord};
pub use vector::{cosine_similarity, rank_records};
