use std::cmp::Reverse;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BinaryHeap, HashSet};
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::HnswParams;
use crate::error::{Result, SepiaError};
use crate::models::{DocumentId, Match, Posting};

/// One vector's node within a single layer graph
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorNode {
    pub id: DocumentId,
    pub vector: Vec<f64>,
    /// Neighbour indices within the same layer
    pub neighbours: Vec<u32>,
    /// This vector's node one layer finer; `None` on the finest layer
    pub entry_down: Option<u32>,
}

/// A single layer: an arena of nodes addressed by index, edges as indices
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct LayerGraph {
    nodes: Vec<VectorNode>,
}

/// Hierarchical navigable small-world graph for approximate nearest-neighbour
/// search over dense vectors.
///
/// Layer 0 is the coarsest; the last layer is the densest and holds every
/// inserted vector. A vector inserted at layer `l` appears on every layer
/// from `l` down to the finest, each incarnation chaining to the next via
/// `entry_down`. Level assignment hashes the document id against a seed, so
/// replaying the same inserts rebuilds the same graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hnsw {
    level_multiplier: f64,
    max_neighbours: usize,
    ef_construction: usize,
    level_seed: u64,
    index: Vec<LayerGraph>,
}

impl Hnsw {
    pub fn new(params: &HnswParams) -> Self {
        let layers = params.layers.max(1);
        Self {
            level_multiplier: params.level_multiplier,
            max_neighbours: params.max_neighbours,
            ef_construction: params.ef_construction,
            level_seed: params.level_seed,
            index: vec![LayerGraph::default(); layers],
        }
    }

    /// Number of layers
    pub fn layer_count(&self) -> usize {
        self.index.len()
    }

    /// Number of nodes on a given layer
    pub fn layer_len(&self, layer: usize) -> usize {
        self.index.get(layer).map(|g| g.nodes.len()).unwrap_or(0)
    }

    /// Number of inserted vectors
    pub fn len(&self) -> usize {
        self.index.last().map(|g| g.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.index.first().map(|g| g.nodes.is_empty()).unwrap_or(true)
    }

    /// Layer a new vector starts on: `min(⌊−ln(U)·mL⌋, L−1)` with U drawn
    /// from a seeded hash of the id.
    fn insertion_layer(&self, id: DocumentId) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        self.level_seed.hash(&mut hasher);
        let uniform = hasher.finish() as f64 / u64::MAX as f64;
        let layer = (-uniform.ln() * self.level_multiplier).floor() as usize;
        layer.min(self.index.len() - 1)
    }

    /// Insert a vector under the given document id
    pub fn insert(&mut self, id: DocumentId, vector: Vec<f64>) {
        if self.is_empty() {
            // Bootstrap a singleton on every layer, each chaining downward.
            let layers = self.index.len();
            for (layer, graph) in self.index.iter_mut().enumerate() {
                let entry_down = if layer + 1 < layers { Some(0) } else { None };
                graph.nodes.push(VectorNode {
                    id,
                    vector: vector.clone(),
                    neighbours: Vec::new(),
                    entry_down,
                });
            }
            return;
        }

        let insert_from = self.insertion_layer(id);
        let layers = self.index.len();
        let mut entry: u32 = 0;

        for layer in 0..layers {
            if layer < insert_from {
                // Coarse side: greedy refinement only, then descend.
                let nearest = self.search_layer(layer, entry, &vector, 1)[0].0;
                if let Some(down) = self.index[layer].nodes[nearest as usize].entry_down {
                    entry = down;
                }
                continue;
            }

            let nearest = self.search_layer(layer, entry, &vector, self.ef_construction);
            let new_idx = self.index[layer].nodes.len() as u32;
            let entry_down = if layer + 1 < layers {
                Some(self.index[layer + 1].nodes.len() as u32)
            } else {
                None
            };

            let selected: Vec<u32> = nearest
                .iter()
                .take(self.max_neighbours)
                .map(|&(node, _)| node)
                .collect();

            self.index[layer].nodes.push(VectorNode {
                id,
                vector: vector.clone(),
                neighbours: selected.clone(),
                entry_down,
            });

            for &neighbour in &selected {
                {
                    let edges = &mut self.index[layer].nodes[neighbour as usize].neighbours;
                    if !edges.contains(&new_idx) {
                        edges.push(new_idx);
                    }
                }
                if self.index[layer].nodes[neighbour as usize].neighbours.len()
                    > self.max_neighbours
                {
                    self.prune_neighbours(layer, neighbour);
                }
            }

            // Carry the best match's descent link into the next layer.
            let carrier = selected.first().copied().unwrap_or(entry);
            if let Some(down) = self.index[layer].nodes[carrier as usize].entry_down {
                entry = down;
            }
        }
    }

    /// Keep only the `max_neighbours` nearest edges of a node
    fn prune_neighbours(&mut self, layer: usize, node: u32) {
        let base = self.index[layer].nodes[node as usize].vector.clone();
        let mut scored: Vec<(OrderedFloat<f64>, u32)> = self.index[layer].nodes[node as usize]
            .neighbours
            .iter()
            .map(|&n| {
                let dist = cosine_distance(&base, &self.index[layer].nodes[n as usize].vector);
                (OrderedFloat(dist), n)
            })
            .collect();
        scored.sort();
        scored.truncate(self.max_neighbours);
        self.index[layer].nodes[node as usize].neighbours =
            scored.into_iter().map(|(_, n)| n).collect();
    }

    /// Best-first search within one layer: a min-heap of candidates to
    /// expand against a max-heap holding the best `ef` seen. Expansion stops
    /// once the nearest candidate is worse than the worst retained result.
    /// Returns up to `ef` entries sorted by ascending distance.
    fn search_layer(&self, layer: usize, entry: u32, query: &[f64], ef: usize) -> Vec<(u32, f64)> {
        let graph = &self.index[layer];
        let start = OrderedFloat(cosine_distance(query, &graph.nodes[entry as usize].vector));

        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(entry);

        let mut candidates = BinaryHeap::new();
        candidates.push(Reverse((start, entry)));
        let mut results = BinaryHeap::new();
        results.push((start, entry));

        while let Some(Reverse((dist, node))) = candidates.pop() {
            let worst = results.peek().map(|&(d, _)| d).unwrap_or(start);
            if dist > worst {
                break;
            }

            for &neighbour in &graph.nodes[node as usize].neighbours {
                if !visited.insert(neighbour) {
                    continue;
                }
                let d = OrderedFloat(cosine_distance(
                    query,
                    &graph.nodes[neighbour as usize].vector,
                ));
                let worst = results.peek().map(|&(w, _)| w).unwrap_or(d);
                if d < worst || results.len() < ef {
                    candidates.push(Reverse((d, neighbour)));
                    results.push((d, neighbour));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(u32, f64)> = results.into_iter().map(|(d, n)| (n, d.0)).collect();
        out.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        out
    }

    /// k-NN search: refine the entry point with ef=1 per layer, descend via
    /// `entry_down`, then run the full `ef` search on the finest layer.
    /// Scores are cosine distances (lower is closer).
    pub fn search(&self, query: &[f64], ef: usize) -> Vec<Match> {
        if self.is_empty() {
            return Vec::new();
        }

        let layers = self.index.len();
        let mut entry: u32 = 0;
        for layer in 0..layers - 1 {
            let nearest = self.search_layer(layer, entry, query, 1)[0].0;
            if let Some(down) = self.index[layer].nodes[nearest as usize].entry_down {
                entry = down;
            }
        }

        let finest = layers - 1;
        self.search_layer(finest, entry, query, ef)
            .into_iter()
            .map(|(node, dist)| Match {
                offsets: vec![Posting::new(self.index[finest].nodes[node as usize].id, 0)],
                score: dist,
            })
            .collect()
    }

    /// Serialize the whole structure; round-trips exactly
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SepiaError::Codec(format!("vector index: {e}")))
    }
}

/// Cosine distance `1 − (a·b)/(‖a‖·‖b‖)`. Vectors must be non-zero; that is
/// the caller's responsibility.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
