use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam::channel;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::analyzer::Analyzer;
use crate::config::EngineConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, SepiaError};
use crate::index::{Hnsw, HybridSearch, InvertedIndex};
use crate::metrics::EngineMetrics;
use crate::models::{Command, DocumentId, Match};
use crate::storage::memtable::Memtable;
use crate::storage::provider::{FileMetadata, Provider, INVERTED_SEGMENT_DIR, VECTOR_SEGMENT_DIR};
use crate::storage::reader::SegmentReader;
use crate::storage::writer::SegmentWriter;

/// State guarded by the writer lock: the memtable queue (the last entry is
/// the mutable one), the segment catalogue, and the decoded in-memory pair
/// for every segment.
struct EngineState {
    provider: Provider,
    memtables: Vec<Memtable>,
    segments: Vec<FileMetadata>,
    loaded: Vec<HybridSearch>,
}

impl EngineState {
    fn mutable(&mut self) -> &mut Memtable {
        self.memtables
            .last_mut()
            .expect("queue always ends with the mutable memtable")
    }

    fn queue_size(&self) -> usize {
        self.memtables.iter().map(Memtable::size).sum()
    }
}

/// LSM-style hybrid index storage.
///
/// A single writer at a time is assumed (the replicated log serialises
/// writes); readers run concurrently against the same lock. Loaded segments
/// are immutable after load, so the per-segment search fan-out needs no
/// further locking.
pub struct IndexStorage {
    state: RwLock<EngineState>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl IndexStorage {
    /// Open an engine over a data directory: enumerate and decode every
    /// segment pair, then seed one empty mutable memtable. A segment that
    /// fails to decode makes the whole open fail.
    pub fn open(config: EngineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let mut provider = Provider::new(&config.data_dir)?;

        info!(data_dir = %config.data_dir.display(), "loading segments");
        let mut segments = Vec::new();
        let mut loaded = Vec::new();
        for meta in provider.list_files()? {
            if !meta.is_segment() {
                continue;
            }
            let inverted =
                SegmentReader::new(provider.open_for_reading(&meta, INVERTED_SEGMENT_DIR)?)
                    .load_inverted_index(Analyzer::new(&config.analyzer), config.seed)?;
            let vector = SegmentReader::new(provider.open_for_reading(&meta, VECTOR_SEGMENT_DIR)?)
                .load_vector_index()?;
            loaded.push(HybridSearch::new(inverted, vector));
            segments.push(meta);
        }
        info!(segments = segments.len(), "segments loaded");

        let metrics = EngineMetrics::new()?;
        let memtables = vec![Self::fresh_memtable(&config)];

        Ok(Self {
            state: RwLock::new(EngineState {
                provider,
                memtables,
                segments,
                loaded,
            }),
            embedder,
            config,
            metrics,
        })
    }

    fn fresh_memtable(config: &EngineConfig) -> Memtable {
        let hybrid = HybridSearch::new(
            InvertedIndex::new(Analyzer::new(&config.analyzer), config.seed),
            Hnsw::new(&config.hnsw),
        );
        Memtable::new(hybrid, config.memtable_size_limit)
    }

    /// Index one document. Rejects documents that could never fit a
    /// memtable, rotates the mutable memtable when it lacks room, and flushes
    /// sealed memtables once the queue outgrows the flush threshold.
    pub fn index(&self, doc_id: DocumentId, document: &str) -> Result<()> {
        let timer = self.metrics.index_latency.start_timer();
        if document.len() > self.config.memtable_size_limit {
            return Err(SepiaError::InputTooLarge {
                size: document.len(),
                limit: self.config.memtable_size_limit,
            });
        }

        let flush_needed = {
            let mut state = self.state.write();
            if !state.mutable().has_room_for_write(document.len()) {
                debug!(doc_id, "rotating memtable");
                state.memtables.push(Self::fresh_memtable(&self.config));
                self.metrics.memtable_rotations.inc();
            }
            state
                .mutable()
                .insert(self.embedder.as_ref(), doc_id, document)?;
            state.queue_size() > self.config.flush_threshold
        };
        self.metrics.documents_indexed.inc();

        if flush_needed {
            self.flush_sealed()?;
        }
        timer.observe_duration();
        Ok(())
    }

    /// Apply a raw replicated-log entry
    pub fn apply(&self, raw: &[u8]) -> Result<()> {
        let command: Command = serde_json::from_slice(raw)?;
        debug!(command = command.name(), "applying replicated command");
        match command {
            Command::Index { doc_id, document } => self.index(doc_id, &document),
            Command::BulkIndex { doc_ids, documents } => self.bulk_index(&doc_ids, &documents),
        }
    }

    /// Index a batch of documents in order
    pub fn bulk_index(&self, doc_ids: &[DocumentId], documents: &[String]) -> Result<()> {
        if doc_ids.len() != documents.len() {
            return Err(SepiaError::Internal(format!(
                "bulk index arity mismatch: {} ids, {} documents",
                doc_ids.len(),
                documents.len()
            )));
        }
        for (doc_id, document) in doc_ids.iter().zip(documents) {
            self.index(*doc_id, document)?;
        }
        Ok(())
    }

    /// Query every memtable (in queue order) and every loaded segment (in
    /// parallel), then merge: concatenate, sort by score descending,
    /// truncate to `k`.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Match>> {
        let timer = self.metrics.search_latency.start_timer();
        self.metrics.searches_total.inc();

        let state = self.state.read();
        let mut matches = Vec::new();
        // Oldest memtable contributes first, then newer ones; the final sort
        // is stable, so score ties resolve by queue position.
        for memtable in state.memtables.iter() {
            matches.extend(memtable.get(self.embedder.as_ref(), query, k)?);
        }

        if !state.loaded.is_empty() {
            let embedder = self.embedder.as_ref();
            let (tx, rx) = channel::bounded(state.loaded.len());
            thread::scope(|scope| {
                for hybrid in &state.loaded {
                    let tx = tx.clone();
                    scope.spawn(move || {
                        let _ = tx.send(hybrid.search(embedder, query, k));
                    });
                }
            });
            drop(tx);
            for result in rx {
                matches.extend(result?);
            }
        }
        drop(state);

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(k);
        timer.observe_duration();
        Ok(matches)
    }

    /// Flush every memtable except the current mutable one
    fn flush_sealed(&self) -> Result<()> {
        while self.state.read().memtables.len() > 1 {
            self.flush_front()?;
        }
        Ok(())
    }

    /// Flush every non-empty memtable, the mutable one included, and leave a
    /// single fresh mutable behind. Called on graceful shutdown.
    pub fn flush_memtables(&self) -> Result<()> {
        info!("flushing memtables");
        loop {
            let mut state = self.state.write();
            let Some(front) = state.memtables.first() else {
                break;
            };
            if front.is_empty() {
                state.memtables.remove(0);
                continue;
            }
            drop(state);
            self.flush_front()?;
        }

        let mut state = self.state.write();
        if state.memtables.is_empty() {
            state.memtables.push(Self::fresh_memtable(&self.config));
        }
        Ok(())
    }

    /// Detach the front memtable under a brief write lock, then write its
    /// segment pair with no lock held, so writes keep landing in the rest of
    /// the queue while the slow gzip and fsync work runs. Only after both
    /// files close cleanly are the catalogue entry and the in-memory pair
    /// published; on a write failure the cleaned-up memtable goes back to the
    /// front of the queue.
    fn flush_front(&self) -> Result<()> {
        let (meta, memtable, inverted_path, vector_path) = {
            let mut state = self.state.write();
            if state.memtables.is_empty() {
                return Err(SepiaError::Internal("flush of an empty queue".to_string()));
            }
            let meta = state.provider.prepare_new_file();
            let inverted_path = state.provider.segment_path(&meta, INVERTED_SEGMENT_DIR);
            let vector_path = state.provider.segment_path(&meta, VECTOR_SEGMENT_DIR);
            let memtable = state.memtables.remove(0);
            (meta, memtable, inverted_path, vector_path)
        };

        let inverted_bytes = memtable.hybrid().lexical.encode();
        let written = match memtable.hybrid().semantic.encode() {
            Ok(vector_bytes) => {
                info!(
                    file_num = meta.file_num(),
                    inverted_bytes = inverted_bytes.len(),
                    vector_bytes = vector_bytes.len(),
                    "flushing memtable"
                );
                write_segment_pair(&inverted_path, &vector_path, &inverted_bytes, &vector_bytes)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            self.metrics.flush_errors.inc();
            remove_partial_pair(&inverted_path, &vector_path);
            self.state.write().memtables.insert(0, memtable);
            return Err(err);
        }

        let mut state = self.state.write();
        state.segments.push(meta);
        state.loaded.push(memtable.into_hybrid());
        self.metrics.segments_flushed.inc();
        Ok(())
    }

    /// Number of on-disk segments
    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// Number of memtables in the queue, the mutable one included
    pub fn memtable_count(&self) -> usize {
        self.state.read().memtables.len()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}

/// Write both halves of a segment pair. Runs without any engine lock; the
/// caller owns the detached memtable and the freshly allocated paths.
fn write_segment_pair(
    inverted_path: &Path,
    vector_path: &Path,
    inverted: &[u8],
    vector: &[u8],
) -> Result<()> {
    let mut writer = SegmentWriter::create(inverted_path)?;
    writer.write_data_block(inverted)?;
    writer.close()?;

    let mut writer = SegmentWriter::create(vector_path)?;
    writer.write_data_block(vector)?;
    writer.close()?;
    Ok(())
}

/// Delete whatever survived a failed segment write; a pair must never be
/// half-visible. A failed cleanup would leave the catalogue unreadable on the
/// next open, so it terminates the process.
fn remove_partial_pair(inverted_path: &Path, vector_path: &Path) {
    for path in [inverted_path, vector_path] {
        if let Err(err) = std::fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                error!(path = %path.display(), %err, "cannot clean up partial segment");
                std::process::abort();
            }
        }
    }
}
