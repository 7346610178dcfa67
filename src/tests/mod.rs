//! Cross-module integration tests and shared test support.


use crate::semantic::embeddings::{Embedder, EmbeddingError};

/// Deterministic embedder for tests: a vector is the term count over a
/// fixed vocabulary, so similarity rankings are predictable without
/// downloading a model.
pub struct MockEmbedder {
    vocabulary: Vec<&'static str>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            vocabulary: vec![
                "hello", "goodbye", "world", "engine", "oil", "dyno", "pizza", "change",
            ],
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        self.vocabulary
            .iter()
            .map(|word| tokens.iter().filter(|&&token| token == *word).count() as f32)
            .collect()
    }
}

impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-term-count"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Embedder that returns the same vector for every input; used to drive
/// dimension-mismatch paths.
pub struct FixedEmbedder {
    vector: Vec<f32>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

impl Embedder for FixedEmbedder {
    fn model_name(&self) -> &str {
        "mock-fixed"
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}

#[test]
fn mock_embedder_counts_terms() {
    let embedder = MockEmbedder::new();
    let vector = embedder.embed("hello hello world").unwrap();
    assert_eq!(vector[0], 2.0);
    assert_eq!(vector[2], 1.0);
    assert_eq!(vector.iter().sum::<f32>(), 3.0);
}

#[test]
fn mock_embedder_is_deterministic() {
    let embedder = MockEmbedder::new();
    assert_eq!(
        embedder.embed("engine oil").unwrap(),
        embedder.embed("engine oil").unwrap()
    );
}
