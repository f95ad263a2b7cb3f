use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::HybridSearch;
use crate::models::{DocumentId, Match};

/// Mutable in-memory index pair awaiting flush. Size accounting drives
/// rotation: `size_used` is the cumulative byte length of every document
/// written here.
pub struct Memtable {
    hybrid: HybridSearch,
    size_used: usize,
    size_limit: usize,
}

impl Memtable {
    pub fn new(hybrid: HybridSearch, size_limit: usize) -> Self {
        Self {
            hybrid,
            size_used: 0,
            size_limit,
        }
    }

    /// Whether an incoming document of `incoming` bytes fits: cumulative
    /// document bytes plus both encoded index sizes must stay under the
    /// limit.
    pub fn has_room_for_write(&self, incoming: usize) -> bool {
        let encoded = self.hybrid.lexical.encode().len()
            + self
                .hybrid
                .semantic
                .encode()
                .map(|b| b.len())
                .unwrap_or_default();
        self.size_used + incoming + encoded <= self.size_limit
    }

    pub fn insert(
        &mut self,
        embedder: &dyn EmbeddingProvider,
        doc_id: DocumentId,
        document: &str,
    ) -> Result<()> {
        self.hybrid.index(embedder, doc_id, document)?;
        self.size_used += document.len();
        Ok(())
    }

    pub fn get(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<Match>> {
        self.hybrid.search(embedder, query, k)
    }

    pub fn size(&self) -> usize {
        self.size_used
    }

    pub fn is_empty(&self) -> bool {
        self.size_used == 0
    }

    pub fn hybrid(&self) -> &HybridSearch {
        &self.hybrid
    }

    /// Hand the index pair over, e.g. to serve as a loaded segment once its
    /// files are on disk.
    pub fn into_hybrid(self) -> HybridSearch {
        self.hybrid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::config::{AnalyzerConfig, HnswParams};
    use crate::embedding::HashedEmbedding;
    use crate::index::{Hnsw, InvertedIndex};

    fn memtable(size_limit: usize) -> Memtable {
        let analyzer = Analyzer::new(&AnalyzerConfig::default());
        let hybrid = HybridSearch::new(
            InvertedIndex::new(analyzer, 11),
            Hnsw::new(&HnswParams::default()),
        );
        Memtable::new(hybrid, size_limit)
    }

    #[test]
    fn test_size_accounting_accumulates_document_bytes() {
        let embedder = HashedEmbedding::new(8);
        let mut memtable = memtable(1 << 20);
        assert!(memtable.is_empty());

        memtable.insert(&embedder, 1, "0123456789").unwrap();
        assert_eq!(memtable.size(), 10);

        memtable.insert(&embedder, 2, "01234").unwrap();
        assert_eq!(memtable.size(), 15);
    }

    #[test]
    fn test_room_check_includes_encoded_sizes() {
        let embedder = HashedEmbedding::new(8);
        let mut memtable = memtable(256);
        assert!(memtable.has_room_for_write(10));

        memtable
            .insert(&embedder, 1, "a modest amount of text here")
            .unwrap();
        // The encoded indexes alone now dwarf the 256-byte limit.
        assert!(!memtable.has_room_for_write(10));
    }

    #[test]
    fn test_get_delegates_to_hybrid_search() {
        let embedder = HashedEmbedding::new(8);
        let mut memtable = memtable(1 << 20);
        memtable.insert(&embedder, 3, "orbital mechanics primer").unwrap();

        let matches = memtable.get(&embedder, "orbital mechanics", 5).unwrap();
        assert_eq!(matches[0].doc_id(), Some(3));
    }
}
