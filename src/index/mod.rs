//! The two index structures and their fusion layer
//!
//! - `SkipList`: ordered postings with log-expected search
//! - `InvertedIndex`: token → postings, phrase and proximity queries, codec
//! - `Hnsw`: layered proximity graph over dense vectors
//! - `HybridSearch`: both indexes queried as one, fused by reciprocal rank

mod hnsw;
mod hybrid;
mod inverted;
mod skip_list;

pub use hnsw::{cosine_distance, Hnsw, VectorNode};
pub use hybrid::HybridSearch;
pub use inverted::InvertedIndex;
pub use skip_list::{SkipList, MAX_HEIGHT};
