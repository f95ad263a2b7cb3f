//! LSM-style lifecycle around the index pair
//!
//! Writes land in a mutable memtable; full memtables are sealed, gzip-framed
//! and written as immutable segment pairs; reads fan out across the memtable
//! queue and every loaded segment and merge by score.

mod engine;
mod memtable;
mod provider;
mod reader;
mod writer;

pub use engine::IndexStorage;
pub use memtable::Memtable;
pub use provider::{
    FileMetadata, FileType, Provider, INVERTED_SEGMENT_DIR, VECTOR_SEGMENT_DIR,
};
pub use reader::SegmentReader;
pub use writer::SegmentWriter;
