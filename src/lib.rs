pub mod analyzer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod metrics;
pub mod models;
pub mod storage;

pub use analyzer::Analyzer;
pub use config::{AnalyzerConfig, EngineConfig, HnswParams};
pub use embedding::{EmbeddingProvider, HashedEmbedding};
pub use error::{Result, SepiaError};
pub use index::{Hnsw, HybridSearch, InvertedIndex, SkipList};
pub use metrics::EngineMetrics;
pub use models::*;
pub use storage::IndexStorage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
