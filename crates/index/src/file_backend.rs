//! JSONL-file index. Reads chunk records written by an ingestion job.
//!
//! Each line is a JSON-encoded [`IndexRecord`]. The file is loaded once into
//! memory; this index never writes.
//!
//! Default location: `~/.finrag/index/chunks.jsonl`

use async_trait::async_trait;
use finrag_core::error::IndexError;
use finrag_core::index::{IndexMatch, VectorIndex};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::in_memory::IndexRecord;
use crate::vector::rank_records;

pub struct JsonlIndex {
    path: PathBuf,
    records: Vec<IndexRecord>,
}

impl JsonlIndex {
    /// Load the index at `path`.
    ///
    /// A missing file is an empty index. Corrupted lines are skipped with a
    /// warning. Any other read failure is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        let records = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = records.len(), "JSONL index loaded");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<Vec<IndexRecord>, IndexError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Index file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(IndexError::Storage(format!(
                    "Failed to read index file {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<IndexRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping corrupted index record");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl VectorIndex for JsonlIndex {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        rank_records(&self.records, vector, top_k)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.records.len())
    }
}
