//! Embedding provider trait and mock implementation.
//!
//! The store consumes embeddings through [`EmbeddingProvider`]; the model
//! behind it (fastembed, a hosted API, ...) is the caller's choice.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: deterministic unit vectors for testing

use async_trait::async_trait;

use crate::error::Result;

/// Trait for turning text into vectors.
///
/// The two methods mirror the two call sites: documents are embedded in
/// batches on write, queries one at a time on search. Some models embed
/// queries differently from documents, so they are kept separate.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of document texts, one vector per text, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// A mock embedding provider for testing.
///
/// Vectors are derived from the text bytes and normalized, so equal texts
/// produce equal vectors.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte = if bytes.is_empty() {
                    0
                } else {
                    bytes[i % bytes.len()]
                };
                ((f32::from(byte) + i as f32) % 256.0) / 256.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| self.deterministic_embedding(t))
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.deterministic_embedding(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_query_is_unit_length() {
        let provider = MockEmbeddingProvider::new(8);
        let embedding = provider.embed_query("hello world").await.unwrap();

        assert_eq!(embedding.len(), 8);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_documents_match_queries() {
        let provider = MockEmbeddingProvider::new(16);
        let docs = provider
            .embed_documents(&["same text".to_string(), "other".to_string()])
            .await
            .unwrap();
        let query = provider.embed_query("same text").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], query);
        assert_ne!(docs[1], query);
    }

    #[tokio::test]
    async fn test_mock_empty_batch() {
        let provider = MockEmbeddingProvider::new(4);
        assert!(provider.embed_documents(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn EmbeddingProvider) {}
        let provider = MockEmbeddingProvider::new(3);
        assert_eq!(provider.dimension(), 3);
        assert_eq!(provider.name(), "mock");
    }
}
