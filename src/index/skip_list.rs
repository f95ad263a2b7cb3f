use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::{Position, Posting};

/// Tallest tower a node may grow
pub const MAX_HEIGHT: usize = 32;

/// End-of-chain marker in tower links
const NIL: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct Node {
    key: Posting,
    /// tower[level] = arena index of the next node at that level. Entries may
    /// be NIL at a chain tail, and decoded lists may carry truncated towers.
    tower: Vec<u32>,
}

/// Ordered set of postings with expected O(log n) search.
///
/// Nodes live in an arena and link forward through integer indices, so the
/// structure is cycle-free to serialize and cheap to clone. Level 0 is the
/// complete ordered chain; higher levels are sparser. Keys compare
/// lexicographically on `(doc_id, offset)`.
///
/// Tower heights are drawn from a seeded hash of the key (geometric,
/// `Pr[h >= k] = 2^-(k-1)`, capped at [`MAX_HEIGHT`]) so replicas applying
/// the same writes build identical structures.
#[derive(Clone, Debug)]
pub struct SkipList {
    nodes: Vec<Node>,
    /// head[level] = first node at that level
    head: Vec<u32>,
    height: usize,
    seed: u64,
}

impl SkipList {
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            head: Vec::new(),
            height: 0,
            seed,
        }
    }

    /// Number of keys in the list
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The forward link of `idx` at `level`; NIL when the node does not link
    /// there.
    fn link(&self, idx: u32, level: usize) -> u32 {
        self.nodes[idx as usize]
            .tower
            .get(level)
            .copied()
            .unwrap_or(NIL)
    }

    fn set_link(&mut self, idx: u32, level: usize, target: u32) {
        let tower = &mut self.nodes[idx as usize].tower;
        if tower.len() <= level {
            tower.resize(level + 1, NIL);
        }
        tower[level] = target;
    }

    /// Descend from the top live level, walking forward while the next key is
    /// strictly less than the target. Records the last predecessor per level
    /// (`None` meaning the head) and returns the matching node, if any.
    fn locate(&self, key: Posting) -> (Option<u32>, [Option<u32>; MAX_HEIGHT]) {
        let mut journey = [None; MAX_HEIGHT];
        let mut prev: Option<u32> = None;

        for level in (0..self.height).rev() {
            let mut next = match prev {
                Some(p) => self.link(p, level),
                None => self.head[level],
            };
            while next != NIL && self.nodes[next as usize].key < key {
                prev = Some(next);
                next = self.link(next, level);
            }
            journey[level] = prev;
        }

        let mut found = None;
        if self.height > 0 {
            let candidate = match journey[0] {
                Some(p) => self.link(p, 0),
                None => self.head[0],
            };
            if candidate != NIL && self.nodes[candidate as usize].key == key {
                found = Some(candidate);
            }
        }

        (found, journey)
    }

    /// Insert a key. Re-inserting an existing key overwrites in place, so the
    /// operation is idempotent.
    pub fn insert(&mut self, key: Posting) {
        let (found, journey) = self.locate(key);

        if let Some(idx) = found {
            self.nodes[idx as usize].key = key;
            return;
        }

        let height = self.random_height(key);
        let idx = self.nodes.len() as u32;
        let mut tower = vec![NIL; height];

        for level in 0..height {
            if level >= self.height {
                // First node to reach this level; raise the list.
                self.head.push(idx);
                continue;
            }
            match journey[level] {
                Some(prev) => {
                    tower[level] = self.link(prev, level);
                    self.set_link(prev, level, idx);
                }
                None => {
                    tower[level] = self.head[level];
                    self.head[level] = idx;
                }
            }
        }

        self.nodes.push(Node { key, tower });
        self.height = self.head.len();
    }

    /// Look up an exact key; misses come back as the EOF sentinel.
    pub fn find(&self, key: Posting) -> Position {
        match self.locate(key).0 {
            Some(idx) => Position::At(self.nodes[idx as usize].key),
            None => Position::Eof,
        }
    }

    /// Greatest key strictly less than `key`, or BOF
    pub fn find_less_than(&self, key: Posting) -> Position {
        match self.locate(key).1[0] {
            Some(idx) => Position::At(self.nodes[idx as usize].key),
            None => Position::Bof,
        }
    }

    /// Smallest key strictly greater than `key`, whether or not `key` is
    /// present, or EOF
    pub fn find_greater_than(&self, key: Posting) -> Position {
        let (found, journey) = self.locate(key);
        let next = match found {
            Some(idx) => self.link(idx, 0),
            None => match journey[0] {
                Some(prev) => self.link(prev, 0),
                None => self.head.first().copied().unwrap_or(NIL),
            },
        };
        if next == NIL {
            Position::Eof
        } else {
            Position::At(self.nodes[next as usize].key)
        }
    }

    /// Smallest key in the list
    pub fn first(&self) -> Position {
        match self.head.first().copied() {
            Some(idx) if idx != NIL => Position::At(self.nodes[idx as usize].key),
            _ => Position::Eof,
        }
    }

    /// Largest key in the list
    pub fn last(&self) -> Position {
        let mut prev: Option<u32> = None;
        for level in (0..self.height).rev() {
            let mut next = match prev {
                Some(p) => self.link(p, level),
                None => self.head[level],
            };
            while next != NIL {
                prev = Some(next);
                next = self.link(next, level);
            }
        }
        match prev {
            Some(idx) => Position::At(self.nodes[idx as usize].key),
            None => Position::Eof,
        }
    }

    /// Walk the complete level-0 chain in key order
    pub fn iter(&self) -> impl Iterator<Item = Posting> + '_ {
        let mut next = self.head.first().copied().unwrap_or(NIL);
        std::iter::from_fn(move || {
            if next == NIL {
                return None;
            }
            let node = &self.nodes[next as usize];
            next = node.tower.first().copied().unwrap_or(NIL);
            Some(node.key)
        })
    }

    fn random_height(&self, key: Posting) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        self.seed.hash(&mut hasher);
        let bits = hasher.finish();
        (bits.trailing_ones() as usize + 1).min(MAX_HEIGHT)
    }

    /// Arena indices in level-0 chain order, for the codec
    pub(crate) fn chain_indices(&self) -> Vec<u32> {
        let mut chain = Vec::with_capacity(self.nodes.len());
        let mut next = self.head.first().copied().unwrap_or(NIL);
        while next != NIL {
            chain.push(next);
            next = self.link(next, 0);
        }
        chain
    }

    pub(crate) fn key_of(&self, idx: u32) -> Posting {
        self.nodes[idx as usize].key
    }

    /// A node's forward links up to its first NIL entry
    pub(crate) fn forward_links(&self, idx: u32) -> &[u32] {
        let tower = &self.nodes[idx as usize].tower;
        let end = tower.iter().position(|&t| t == NIL).unwrap_or(tower.len());
        &tower[..end]
    }

    /// The head links up to their first NIL entry
    pub(crate) fn head_links(&self) -> &[u32] {
        let end = self.head.iter().position(|&t| t == NIL).unwrap_or(self.head.len());
        &self.head[..end]
    }

    /// Rebuild a list from a decoded level-0 chain: per-node keys, per-node
    /// forward links (arena indices at consecutive levels), and head links.
    /// Tower shape may legitimately differ from the list that was encoded;
    /// keys, chain order and all find behaviours are preserved.
    pub(crate) fn from_chain(
        keys: Vec<Posting>,
        towers: Vec<Vec<u32>>,
        head: Vec<u32>,
        seed: u64,
    ) -> Self {
        debug_assert_eq!(keys.len(), towers.len());
        let height = head.len();
        let nodes = keys
            .into_iter()
            .zip(towers)
            .map(|(key, tower)| Node { key, tower })
            .collect();
        Self {
            nodes,
            head,
            height,
            seed,
        }
    }
}
