use prometheus::{Counter, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Prometheus metrics for the storage engine
#[derive(Clone)]
pub struct EngineMetrics {
    // Counters
    pub documents_indexed: Counter,
    pub searches_total: Counter,
    pub memtable_rotations: Counter,
    pub segments_flushed: Counter,
    pub flush_errors: Counter,

    // Histograms
    pub index_latency: Histogram,
    pub search_latency: Histogram,

    // Registry
    registry: Arc<Registry>,
}

impl EngineMetrics {
    /// Create a new EngineMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let documents_indexed = Counter::with_opts(Opts::new(
            "sepia_documents_indexed_total",
            "Total number of documents indexed",
        ))?;
        registry.register(Box::new(documents_indexed.clone()))?;

        let searches_total = Counter::with_opts(Opts::new(
            "sepia_searches_total",
            "Total number of searches served",
        ))?;
        registry.register(Box::new(searches_total.clone()))?;

        let memtable_rotations = Counter::with_opts(Opts::new(
            "sepia_memtable_rotations_total",
            "Total number of memtable rotations",
        ))?;
        registry.register(Box::new(memtable_rotations.clone()))?;

        let segments_flushed = Counter::with_opts(Opts::new(
            "sepia_segments_flushed_total",
            "Total number of segment pairs written to disk",
        ))?;
        registry.register(Box::new(segments_flushed.clone()))?;

        let flush_errors = Counter::with_opts(Opts::new(
            "sepia_flush_errors_total",
            "Total number of failed flush attempts",
        ))?;
        registry.register(Box::new(flush_errors.clone()))?;

        let index_latency = Histogram::with_opts(
            HistogramOpts::new("sepia_index_latency_seconds", "Index operation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(index_latency.clone()))?;

        let search_latency = Histogram::with_opts(
            HistogramOpts::new("sepia_search_latency_seconds", "Search operation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(search_latency.clone()))?;

        Ok(Self {
            documents_indexed,
            searches_total,
            memtable_rotations,
            segments_flushed,
            flush_errors,
            index_latency,
            search_latency,
            registry: Arc::new(registry),
        })
    }

    /// Registry for scraping
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
