//! Exact cosine-similarity search over a loaded index.
//!
//! A full linear scan, O(rows * dimensions) per query. No pruning, no
//! approximation: the same index and query always produce the same
//! scores and the same order.

use thiserror::Error;

use crate::semantic::embeddings::{Embedder, EmbeddingError};
use crate::semantic::index::{EmbeddingRecord, VectorIndex};

#[derive(Debug, Error)]
pub enum SearchError {
    /// The index holds no embeddings. Recoverable: the serving layer
    /// reports it and returns an empty result set.
    #[error("The index contains no embeddings")]
    EmptyIndex,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Query dimension mismatch: index has {expected}, query embedding has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// One ranked search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Cosine similarity against the query. Always > 0 here: candidates
    /// at or below zero are treated as "not a match" and dropped.
    pub score: f32,
    pub record: EmbeddingRecord,
}

impl SearchHit {
    pub fn content(&self) -> &str {
        &self.record.content
    }
}

/// Rank every indexed message against `query` and keep the best `top_k`.
///
/// Ties keep index order, so results are deterministic across runs.
pub fn search(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>, SearchError> {
    if index.is_empty() {
        return Err(SearchError::EmptyIndex);
    }

    let query_embedding = embedder.embed(query)?;
    if query_embedding.len() != index.dimensions() {
        return Err(SearchError::DimensionMismatch {
            expected: index.dimensions(),
            got: query_embedding.len(),
        });
    }

    let query_norm = l2_norm(&query_embedding);

    let mut scored: Vec<(usize, f32)> = (0..index.len())
        .map(|i| {
            (
                i,
                cosine_similarity(&query_embedding, index.row(i), query_norm),
            )
        })
        .collect();

    // Stable sort: equal scores keep ascending index order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(scored
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .take(top_k)
        .map(|(i, score)| SearchHit {
            score,
            record: index.record(i).clone(),
        })
        .collect())
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with a zero-norm guard on either side: degenerate
/// vectors score 0 instead of dividing by zero.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    if query_norm < f32::EPSILON {
        return 0.0;
    }
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MockEmbedder;

    fn record(line: u32, content: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            content: content.to_string(),
            line_number: line,
            timestamp: None,
            username: None,
            source_file: "chat.txt".to_string(),
            discord: None,
        }
    }

    fn index_of(contents: &[&str]) -> (VectorIndex, MockEmbedder) {
        let embedder = MockEmbedder::new();
        let records: Vec<EmbeddingRecord> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| record(i as u32 + 1, c))
            .collect();
        let texts: Vec<String> = contents.iter().map(|c| c.to_string()).collect();
        let vectors = embedder.embed_batch(&texts).unwrap();
        let embeddings: Vec<f32> = vectors.into_iter().flatten().collect();

        let index = VectorIndex::from_parts(
            embedder.model_name().to_string(),
            embedder.dimensions(),
            embeddings,
            records,
        )
        .unwrap();
        (index, embedder)
    }

    #[test]
    fn ranks_closer_content_first() {
        let (index, embedder) = index_of(&["hello world", "goodbye world"]);

        let hits = search(&index, &embedder, "hello", 10).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].content(), "hello world");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn drops_non_positive_scores() {
        // "pizza" shares no terms with either message, so both score 0
        // and are filtered out.
        let (index, embedder) = index_of(&["hello world", "goodbye world"]);

        let hits = search(&index, &embedder, "pizza", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn respects_top_k() {
        let (index, embedder) =
            index_of(&["hello one", "hello two", "hello three", "hello four"]);

        let hits = search(&index, &embedder, "hello", 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn ties_keep_index_order() {
        let (index, embedder) = index_of(&["hello", "hello", "hello"]);

        let hits = search(&index, &embedder, "hello", 10).unwrap();
        let lines: Vec<u32> = hits.iter().map(|h| h.record.line_number).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let (index, embedder) = index_of(&["hello world", "goodbye world", "hello there"]);

        let first = search(&index, &embedder, "hello world", 10).unwrap();
        let second = search(&index, &embedder, "hello world", 10).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.score, b.score);
            assert_eq!(a.record, b.record);
        }
    }

    #[test]
    fn empty_index_is_a_distinct_condition() {
        let embedder = MockEmbedder::new();
        let index = VectorIndex::from_parts(
            embedder.model_name().to_string(),
            embedder.dimensions(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap();

        let result = search(&index, &embedder, "hello", 10);
        assert!(matches!(result, Err(SearchError::EmptyIndex)));
    }

    #[test]
    fn zero_norm_rows_score_zero_and_are_dropped() {
        let embedder = MockEmbedder::new();
        let dims = embedder.dimensions();
        // One real row and one all-zero row.
        let mut embeddings = embedder.embed("hello").unwrap();
        embeddings.extend(std::iter::repeat(0.0).take(dims));

        let index = VectorIndex::from_parts(
            embedder.model_name().to_string(),
            dims,
            embeddings,
            vec![record(1, "hello"), record(2, "zeroed")],
        )
        .unwrap();

        let hits = search(&index, &embedder, "hello", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.line_number, 1);
    }

    #[test]
    fn mismatched_query_dimensions_error() {
        let (index, _) = index_of(&["hello world"]);
        let narrow = crate::tests::FixedEmbedder::new(vec![1.0, 0.0]);

        let result = search(&index, &narrow, "hello", 10);
        assert!(matches!(result, Err(SearchError::DimensionMismatch { .. })));
    }
}
