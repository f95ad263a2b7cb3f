use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::Result;

/// Capability for turning text into a fixed-dimension embedding. The engine
/// treats the dimension as opaque; a failure here propagates as an index or
/// search failure and leaves the indexes untouched.
///
/// Passed in at open time; the engine never decides where embeddings come
/// from.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f64>>;
}

/// Plain functions and closures work as providers
impl<F> EmbeddingProvider for F
where
    F: Fn(&str) -> Result<Vec<f64>> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self(text)
    }
}

/// Deterministic embedding derived from token hashes: each token bumps two
/// hash-selected components. Not a semantic model — it gives tests and
/// benches stable, non-zero vectors where similar texts land near each
/// other.
#[derive(Clone, Debug)]
pub struct HashedEmbedding {
    dimensions: usize,
}

impl HashedEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl EmbeddingProvider for HashedEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let mut vector = vec![0.0; self.dimensions];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bits = hasher.finish();
            vector[(bits % self.dimensions as u64) as usize] += 1.0;
            vector[((bits >> 32) % self.dimensions as u64) as usize] += 0.5;
        }
        if vector.iter().all(|&x| x == 0.0) {
            // Cosine distance needs non-zero vectors.
            vector[0] = 1.0;
        }
        Ok(vector)
    }
}
