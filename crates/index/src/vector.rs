//! Vector similarity and top-k ranking.

use finrag_core::error::IndexError;
use finrag_core::index::IndexMatch;

use crate::in_memory::IndexRecord;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to a query embedding.
///
/// Returns at most `top_k` matches sorted by descending similarity, with
/// `score` set. Ties keep insertion order so results are reproducible.
pub fn rank_records(
    records: &[IndexRecord],
    query: &[f32],
    top_k: usize,
) -> Result<Vec<IndexMatch>, IndexError> {
    if let Some(mismatch) = records.iter().find(|r| r.embedding.len() != query.len()) {
        return Err(IndexError::DimensionMismatch {
            expected: mismatch.embedding.len(),
            actual: query.len(),
        });
    }

    let mut scored: Vec<(f32, &IndexRecord)> = records
        .iter()
        .map(|r| (cosine_similarity(&r.embedding, query), r))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(score, r)| IndexMatch {
            metadata: r.metadata.clone(),
            score: Some(score),
        })
        .collect())
}
