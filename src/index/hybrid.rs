use std::collections::{HashMap, HashSet};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{Hnsw, InvertedIndex};
use crate::models::{DocumentId, Match};

/// Candidate-list size handed to the semantic side of a hybrid query
const SEMANTIC_EF: usize = 64;

/// Reciprocal-rank weights; the lexical side gets a slight edge.
const LEXICAL_RRF_WEIGHT: f64 = 1.1;
const SEMANTIC_RRF_WEIGHT: f64 = 1.0;

/// One lexical index and one vector index queried as a unit, their ranked
/// lists fused by reciprocal rank.
pub struct HybridSearch {
    pub lexical: InvertedIndex,
    pub semantic: Hnsw,
}

impl HybridSearch {
    pub fn new(lexical: InvertedIndex, semantic: Hnsw) -> Self {
        Self { lexical, semantic }
    }

    /// Index a document on both sides. The embedding is fetched first, so an
    /// embedder failure leaves neither index touched.
    pub fn index(
        &mut self,
        embedder: &dyn EmbeddingProvider,
        doc_id: DocumentId,
        document: &str,
    ) -> Result<()> {
        let vector = embedder.embed(document)?;
        self.lexical.index(doc_id, document);
        self.semantic.insert(doc_id, vector);
        Ok(())
    }

    /// Run both sides and fuse their rankings
    pub fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<Match>> {
        let lexical = self.lexical.rank_proximity(query, k);
        let vector = embedder.embed(query)?;
        let semantic = self.semantic.search(&vector, SEMANTIC_EF);
        Ok(fuse(lexical, semantic, k))
    }
}

/// Reciprocal rank fusion. Each list contributes `weight / (rank + 1)` keyed
/// by document; when a document appears on both sides the contributions sum
/// and the lexical offsets win. Stable sort keeps insertion order on ties.
fn fuse(lexical: Vec<Match>, semantic: Vec<Match>, k: usize) -> Vec<Match> {
    let mut order: Vec<DocumentId> = Vec::new();
    let mut fused: HashMap<DocumentId, Match> = HashMap::new();

    for (rank, hit) in dedupe_by_doc(lexical).into_iter().enumerate() {
        let Some(doc_id) = hit.doc_id() else { continue };
        let score = LEXICAL_RRF_WEIGHT / (rank as f64 + 1.0);
        order.push(doc_id);
        fused.insert(
            doc_id,
            Match {
                offsets: hit.offsets,
                score,
            },
        );
    }

    for (rank, hit) in dedupe_by_doc(semantic).into_iter().enumerate() {
        let Some(doc_id) = hit.doc_id() else { continue };
        let score = SEMANTIC_RRF_WEIGHT / (rank as f64 + 1.0);
        match fused.get_mut(&doc_id) {
            Some(existing) => existing.score += score,
            None => {
                order.push(doc_id);
                fused.insert(
                    doc_id,
                    Match {
                        offsets: hit.offsets,
                        score,
                    },
                );
            }
        }
    }

    let mut merged: Vec<Match> = order
        .into_iter()
        .filter_map(|doc_id| fused.remove(&doc_id))
        .collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(k);
    merged
}

/// Keep the best-ranked hit per document
fn dedupe_by_doc(hits: Vec<Match>) -> Vec<Match> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| hit.doc_id().map(|d| seen.insert(d)).unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::config::{AnalyzerConfig, HnswParams};
    use crate::embedding::HashedEmbedding;
    use crate::models::Posting;

    fn hit(doc_id: DocumentId) -> Match {
        Match::new(vec![Posting::new(doc_id, 0)], 0.0)
    }

    fn hybrid() -> HybridSearch {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        HybridSearch::new(
            InvertedIndex::new(analyzer, 11),
            Hnsw::new(&HnswParams::default()),
        )
    }

    #[test]
    fn test_fusion_arithmetic() {
        let lexical = vec![hit(1), hit(2), hit(3)];
        let semantic = vec![hit(1), hit(4), hit(9)];

        let fused = fuse(lexical, semantic, 10);
        let scores: HashMap<DocumentId, f64> = fused
            .iter()
            .map(|m| (m.doc_id().unwrap(), m.score))
            .collect();

        assert!((scores[&1] - 2.1).abs() < 1e-9);
        assert!((scores[&2] - 0.55).abs() < 1e-9);
        assert!((scores[&4] - 0.5).abs() < 1e-9);
        assert!((scores[&3] - 1.1 / 3.0).abs() < 1e-9);
        assert!((scores[&9] - 1.0 / 3.0).abs() < 1e-9);

        let top: Vec<DocumentId> = fused.iter().take(2).filter_map(Match::doc_id).collect();
        assert_eq!(top, vec![1, 2]);
    }

    #[test]
    fn test_lexical_offsets_win_on_overlap() {
        let lexical = vec![Match::new(vec![Posting::new(5, 2), Posting::new(5, 4)], 0.0)];
        let semantic = vec![Match::new(vec![Posting::new(5, 0)], 0.3)];

        let fused = fuse(lexical, semantic, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(
            fused[0].offsets,
            vec![Posting::new(5, 2), Posting::new(5, 4)]
        );
        assert!((fused[0].score - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_fusion_truncates_to_k() {
        let lexical = vec![hit(1), hit(2), hit(3), hit(4)];
        let fused = fuse(lexical, Vec::new(), 2);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_index_and_search() {
        let embedder = HashedEmbedding::new(16);
        let mut hybrid = hybrid();

        hybrid.index(&embedder, 1, "rust systems programming").unwrap();
        hybrid.index(&embedder, 2, "garden tools catalogue").unwrap();

        let results = hybrid.search(&embedder, "systems programming", 5).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].doc_id(), Some(1));
    }

    #[test]
    fn test_embedding_failure_leaves_both_sides_untouched() {
        let failing = |_text: &str| -> crate::error::Result<Vec<f64>> {
            Err(crate::error::SepiaError::Embedding("host down".to_string()))
        };
        let mut hybrid = hybrid();

        assert!(hybrid.index(&failing, 1, "some document").is_err());
        assert!(hybrid.lexical.is_empty());
        assert!(hybrid.semantic.is_empty());
    }
}
