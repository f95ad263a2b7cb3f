use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default ceiling on a single memtable, in bytes.
pub const DEFAULT_MEMTABLE_SIZE_LIMIT: usize = 20_000_000;

/// Text analysis configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub lowercase: bool,
    pub stopwords: Vec<String>,
}

impl AnalyzerConfig {
    /// Stopwords dropped by the default configuration. The same list must be
    /// in effect at index and query time.
    pub const DEFAULT_STOPWORDS: [&'static str; 6] = ["is", "my", "your", "the", "to", "in"];

    /// Configuration that keeps every token, for corpora where stopwords are
    /// meaningful query terms.
    pub fn without_stopwords() -> Self {
        Self {
            lowercase: true,
            stopwords: Vec::new(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            stopwords: Self::DEFAULT_STOPWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// HNSW construction parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HnswParams {
    /// Number of graph layers; layer 0 is the coarsest, the last layer holds
    /// every vector.
    pub layers: usize,

    /// Level-assignment multiplier (mL)
    pub level_multiplier: f64,

    /// Max neighbours kept per node (M)
    pub max_neighbours: usize,

    /// Candidate-list size during construction (efc)
    pub ef_construction: usize,

    /// Seed for deterministic layer assignment
    pub level_seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            layers: 5,
            level_multiplier: 0.62,
            max_neighbours: 8,
            ef_construction: 16,
            level_seed: 0x1D10_5EED,
        }
    }
}

/// Engine configuration, injected at open time. No global state anywhere.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub data_dir: PathBuf,

    /// Per-memtable ceiling: cumulative document bytes plus both encoded
    /// index sizes must stay under this before a write is admitted.
    pub memtable_size_limit: usize,

    /// Queue-wide size above which sealed memtables are flushed to disk.
    pub flush_threshold: usize,

    /// Seed for deterministic skip-list tower heights
    pub seed: u64,

    pub analyzer: AnalyzerConfig,
    pub hnsw: HnswParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            memtable_size_limit: DEFAULT_MEMTABLE_SIZE_LIMIT,
            flush_threshold: DEFAULT_MEMTABLE_SIZE_LIMIT,
            seed: 0x5EED_0001,
            analyzer: AnalyzerConfig::default(),
            hnsw: HnswParams::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the per-memtable size ceiling
    pub fn with_memtable_size_limit(mut self, limit: usize) -> Self {
        self.memtable_size_limit = limit;
        self
    }

    /// Set the queue-wide flush threshold
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Set the analyzer configuration
    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the HNSW construction parameters
    pub fn with_hnsw(mut self, hnsw: HnswParams) -> Self {
        self.hnsw = hnsw;
        self
    }
}
