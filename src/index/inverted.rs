use std::collections::HashMap;

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::error::{Result, SepiaError};
use crate::index::skip_list::SkipList;
use crate::models::{DocumentId, Match, Position, Posting};

/// Positional inverted index: token → ordered skip list of occurrences.
///
/// Beyond exact and phrase lookups it answers proximity-ranked queries by
/// walking minimal cover windows through the corpus.
pub struct InvertedIndex {
    postings: HashMap<String, SkipList>,
    analyzer: Analyzer,
    seed: u64,
}

impl InvertedIndex {
    pub fn new(analyzer: Analyzer, seed: u64) -> Self {
        Self {
            postings: HashMap::new(),
            analyzer,
            seed,
        }
    }

    /// Number of distinct tokens
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// The posting list for a token, if any occurrence was indexed
    pub fn posting_list(&self, token: &str) -> Option<&SkipList> {
        self.postings.get(token)
    }

    /// Index a document. Re-indexing the identical `(doc_id, text)` pair is a
    /// no-op thanks to idempotent skip-list insertion.
    pub fn index(&mut self, doc_id: DocumentId, text: &str) {
        debug!(doc_id, "indexing document");
        let seed = self.seed;
        for token in self.analyzer.analyze(text) {
            let list = self
                .postings
                .entry(token.term)
                .or_insert_with(|| SkipList::new(seed));
            list.insert(Posting::new(doc_id, token.position));
        }
    }

    /// Smallest indexed position of `token`
    pub fn first(&self, token: &str) -> Position {
        self.postings
            .get(token)
            .map(SkipList::first)
            .unwrap_or(Position::Eof)
    }

    /// Greatest indexed position of `token`
    pub fn last(&self, token: &str) -> Position {
        self.postings
            .get(token)
            .map(SkipList::last)
            .unwrap_or(Position::Eof)
    }

    /// Smallest indexed position of `token` strictly greater than `from`;
    /// BOF means start from the beginning.
    pub fn next(&self, token: &str, from: Position) -> Position {
        match from {
            Position::Eof => Position::Eof,
            Position::Bof => self.first(token),
            Position::At(key) => self
                .postings
                .get(token)
                .map(|list| list.find_greater_than(key))
                .unwrap_or(Position::Eof),
        }
    }

    /// Greatest indexed position of `token` strictly less than `from`;
    /// EOF means start from the end.
    pub fn previous(&self, token: &str, from: Position) -> Position {
        match from {
            Position::Bof => Position::Bof,
            Position::Eof => match self.postings.get(token) {
                Some(list) => list.last(),
                None => Position::Bof,
            },
            Position::At(key) => self
                .postings
                .get(token)
                .map(|list| list.find_less_than(key))
                .unwrap_or(Position::Bof),
        }
    }

    /// Earliest occurrence after `from` where the phrase's tokens appear in
    /// order, contiguously, within one document. Sweep forward through the
    /// terms to bound the window, then backward to tighten it; accept when
    /// the window spans exactly the phrase length.
    pub fn next_phrase(&self, query: &str, from: Position) -> (Position, Position) {
        let terms = self.analyzer.terms(query);
        if terms.is_empty() {
            return (Position::Eof, Position::Eof);
        }

        let mut cursor = from;
        loop {
            let mut v = cursor;
            for term in &terms {
                v = self.next(term, v);
            }
            let Position::At(vp) = v else {
                return (Position::Eof, Position::Eof);
            };

            let mut u = v;
            for term in terms.iter().rev().skip(1) {
                u = self.previous(term, u);
            }
            let Position::At(up) = u else {
                return (Position::Eof, Position::Eof);
            };

            if up.doc_id == vp.doc_id && vp.offset - up.offset == terms.len() as u32 - 1 {
                return (u, v);
            }
            cursor = u;
        }
    }

    /// Every phrase occurrence at or after `from`, in corpus order
    pub fn find_all_phrases(&self, query: &str, from: Position) -> Vec<(Position, Position)> {
        let mut results = Vec::new();
        let mut cursor = from;
        loop {
            let (u, v) = self.next_phrase(query, cursor);
            if !matches!(u, Position::At(_)) {
                break;
            }
            results.push((u, v));
            cursor = u;
        }
        results
    }

    /// Shortest window after `from` within a single document containing at
    /// least one occurrence of every token. For each token take the smallest
    /// position after `from`; the max is the window end. Then take each
    /// token's greatest position not beyond that end; the min is the window
    /// start. Recurse from the start while the two fall in different
    /// documents.
    pub fn next_cover(&self, tokens: &[String], from: Position) -> (Position, Position) {
        let mut cursor = from;
        loop {
            let mut v = Position::Bof;
            for token in tokens {
                let next = self.next(token, cursor);
                if next.is_eof() {
                    return (Position::Eof, Position::Eof);
                }
                v = v.max(next);
            }
            let Position::At(vp) = v else {
                return (Position::Eof, Position::Eof);
            };

            let probe = Position::at(vp.doc_id, vp.offset + 1);
            let mut u = Position::Eof;
            for token in tokens {
                u = u.min(self.previous(token, probe));
            }
            let Position::At(up) = u else {
                return (Position::Eof, Position::Eof);
            };

            if up.doc_id == vp.doc_id {
                return (u, v);
            }
            cursor = u;
        }
    }

    /// Proximity ranking: walk covers through the corpus and accumulate
    /// `1 / window_width` per document. One match per document, in corpus
    /// order, carrying the document's first cover window; truncated to `k`.
    pub fn rank_proximity(&self, query: &str, k: usize) -> Vec<Match> {
        let tokens = self.analyzer.terms(query);
        debug!(?tokens, "proximity ranking");
        if tokens.is_empty() {
            return Vec::new();
        }

        let (mut u, mut v) = self.next_cover(&tokens, Position::Bof);
        let mut candidate = (u, v);
        let mut score = 0.0;
        let mut results = Vec::new();

        while let (Position::At(up), Position::At(vp)) = (u, v) {
            if let Position::At(cu) = candidate.0 {
                if cu.doc_id < up.doc_id {
                    results.push(make_cover_match(candidate, score));
                    candidate = (u, v);
                    score = 0.0;
                }
            }
            score += 1.0 / f64::from(vp.offset - up.offset + 1);

            let next = self.next_cover(&tokens, u);
            u = next.0;
            v = next.1;
        }

        if matches!(candidate.0, Position::At(_)) {
            results.push(make_cover_match(candidate, score));
        }

        results.truncate(k);
        results
    }

    /// Serialize every posting list into the little-endian segment layout.
    /// Terms are emitted in sorted order so output is deterministic. Each
    /// term's level-0 chain is led by the head sentinel (doc 0, offset 0)
    /// whose tower section carries the per-level entry links; node indices in
    /// tower payloads are 1-based and 16-bit, capping a single posting list
    /// at 65_535 entries.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();

        for term in terms {
            let list = &self.postings[term.as_str()];
            let chain = list.chain_indices();
            debug_assert!(chain.len() < u16::MAX as usize);

            buf.extend_from_slice(&(term.len() as u32).to_le_bytes());
            buf.extend_from_slice(term.as_bytes());

            // Ordinals: head sentinel is 1, chain nodes follow in level-0
            // order.
            let arena_size = list.len();
            let mut ordinals = vec![0u16; arena_size];
            for (i, &idx) in chain.iter().enumerate() {
                ordinals[idx as usize] = (i + 2) as u16;
            }

            let mut nodes_buf = Vec::with_capacity((chain.len() + 1) * 8);
            nodes_buf.extend_from_slice(&0u32.to_le_bytes());
            nodes_buf.extend_from_slice(&0u32.to_le_bytes());
            for &idx in &chain {
                let key = list.key_of(idx);
                nodes_buf.extend_from_slice(&key.doc_id.to_le_bytes());
                nodes_buf.extend_from_slice(&key.offset.to_le_bytes());
            }
            buf.extend_from_slice(&(nodes_buf.len() as u32).to_le_bytes());
            buf.extend_from_slice(&nodes_buf);

            write_tower(&mut buf, list.head_links(), &ordinals);
            for &idx in &chain {
                write_tower(&mut buf, list.forward_links(idx), &ordinals);
            }
        }

        buf
    }

    /// Rebuild an index from its encoded form. The level-0 key sequence and
    /// every find behaviour round-trip; tower shape is allowed to differ.
    pub fn decode(data: &[u8], analyzer: Analyzer, seed: u64) -> Result<Self> {
        let mut postings = HashMap::new();
        let mut cursor = 0usize;

        while cursor < data.len() {
            let tlen = read_u32(data, &mut cursor)? as usize;
            let term = std::str::from_utf8(take(data, &mut cursor, tlen)?)
                .map_err(|e| SepiaError::Codec(format!("invalid token bytes: {e}")))?
                .to_string();

            let nbytes = read_u32(data, &mut cursor)? as usize;
            if nbytes % 8 != 0 || nbytes == 0 {
                return Err(SepiaError::Codec(format!(
                    "malformed node section of {nbytes} bytes for token {term:?}"
                )));
            }
            let total = nbytes / 8;

            // Head sentinel key is structural filler.
            read_u32(data, &mut cursor)?;
            read_u32(data, &mut cursor)?;

            let mut keys = Vec::with_capacity(total - 1);
            for _ in 1..total {
                let doc_id = read_u32(data, &mut cursor)?;
                let offset = read_u32(data, &mut cursor)?;
                keys.push(Posting::new(doc_id, offset));
            }

            let mut head_links = Vec::new();
            let mut towers = vec![Vec::new(); total - 1];
            for i in 0..total {
                let tbytes = read_u32(data, &mut cursor)? as usize;
                if tbytes % 2 != 0 {
                    return Err(SepiaError::Codec(format!(
                        "malformed tower section of {tbytes} bytes for token {term:?}"
                    )));
                }
                let mut links = Vec::with_capacity(tbytes / 2);
                for _ in 0..tbytes / 2 {
                    let ordinal = read_u16(data, &mut cursor)?;
                    if ordinal == 0 {
                        // No forward links from this node.
                        continue;
                    }
                    if ordinal == 1 || ordinal as usize > total {
                        return Err(SepiaError::Codec(format!(
                            "tower index {ordinal} out of range for token {term:?}"
                        )));
                    }
                    links.push(u32::from(ordinal) - 2);
                }
                if i == 0 {
                    head_links = links;
                } else {
                    towers[i - 1] = links;
                }
            }

            postings.insert(term, SkipList::from_chain(keys, towers, head_links, seed));
        }

        Ok(Self {
            postings,
            analyzer,
            seed,
        })
    }
}

fn make_cover_match(cover: (Position, Position), score: f64) -> Match {
    let mut offsets = Vec::with_capacity(2);
    if let Position::At(u) = cover.0 {
        offsets.push(u);
    }
    if let Position::At(v) = cover.1 {
        offsets.push(v);
    }
    Match::new(offsets, score)
}

fn write_tower(buf: &mut Vec<u8>, links: &[u32], ordinals: &[u16]) {
    if links.is_empty() {
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        return;
    }
    buf.extend_from_slice(&((links.len() * 2) as u32).to_le_bytes());
    for &idx in links {
        buf.extend_from_slice(&ordinals[idx as usize].to_le_bytes());
    }
}

fn take<'a>(data: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(n)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| SepiaError::Codec("unexpected end of segment data".to_string()))?;
    let slice = &data[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_u32(data: &[u8], cursor: &mut usize) -> Result<u32> {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(take(data, cursor, 4)?);
    Ok(u32::from_le_bytes(bytes))
}

fn read_u16(data: &[u8], cursor: &mut usize) -> Result<u16> {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(take(data, cursor, 2)?);
    Ok(u16::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;

    fn batman_index() -> InvertedIndex {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let mut index = InvertedIndex::new(analyzer, 11);
        index.index(1, "hello, my name is BATMAN!");
        index.index(2, "I have come to save Gotham!");
        index.index(3, "What is your name");
        index
    }

    #[test]
    fn test_gotham_corpus_posting_list() {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let mut index = InvertedIndex::new(analyzer, 11);
        index.index(1, "hello my name is BATMAN");
        index.index(2, "I have come to save Gotham");
        index.index(3, "What is your name");
        index.index(4, "Where in Gotham is the Joker");

        let list = index.posting_list("gotham").unwrap();
        let keys: Vec<Posting> = list.iter().collect();
        assert_eq!(keys, vec![Posting::new(2, 5), Posting::new(4, 2)]);
        assert_eq!(
            list.find_greater_than(Posting::new(2, 5)),
            Position::at(4, 2)
        );
    }

    #[test]
    fn test_index_records_stream_positions() {
        let index = batman_index();
        let list = index.posting_list("name").unwrap();
        assert_eq!(list.find(Posting::new(1, 2)), Position::at(1, 2));
        assert_eq!(list.find(Posting::new(3, 3)), Position::at(3, 3));
    }

    #[test]
    fn test_next_walks_forward() {
        let index = batman_index();
        assert_eq!(index.next("name", Position::Bof), Position::at(1, 2));
        assert_eq!(index.next("name", Position::at(1, 2)), Position::at(3, 3));
        assert_eq!(index.next("name", Position::at(3, 3)), Position::Eof);
        assert_eq!(index.next("my", Position::at(1, 1)), Position::Eof);
        assert_eq!(index.next("missing", Position::Bof), Position::Eof);
    }

    #[test]
    fn test_previous_walks_backward() {
        let index = batman_index();
        assert_eq!(index.previous("name", Position::Eof), Position::at(3, 3));
        assert_eq!(index.previous("name", Position::at(3, 3)), Position::at(1, 2));
        assert_eq!(index.previous("name", Position::at(1, 2)), Position::Bof);
    }

    #[test]
    fn test_next_previous_adjunction() {
        let index = batman_index();
        // For a posting p of token t: next(t, previous(t, p)) == p.
        for token in ["name", "gotham", "is"] {
            let list = index.posting_list(token).unwrap();
            for posting in list.iter() {
                let p = Position::At(posting);
                assert_eq!(index.next(token, index.previous(token, p)), p);
            }
        }
    }

    #[test]
    fn test_next_phrase() {
        let index = batman_index();
        let (u, v) = index.next_phrase("your name", Position::Bof);
        assert_eq!(u, Position::at(3, 2));
        assert_eq!(v, Position::at(3, 3));
    }

    #[test]
    fn test_next_phrase_no_occurrence() {
        let index = batman_index();
        let (u, v) = index.next_phrase("name your", Position::Bof);
        assert_eq!(u, Position::Eof);
        assert_eq!(v, Position::Eof);
    }

    #[test]
    fn test_find_all_phrases() {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let mut index = InvertedIndex::new(analyzer, 11);
        index.index(1, "to be or not to be");
        index.index(2, "to be");

        let hits = index.find_all_phrases("to be", Position::Bof);
        assert_eq!(
            hits,
            vec![
                (Position::at(1, 0), Position::at(1, 1)),
                (Position::at(1, 4), Position::at(1, 5)),
                (Position::at(2, 0), Position::at(2, 1)),
            ]
        );
    }

    #[test]
    fn test_next_cover() {
        let index = batman_index();
        let tokens = vec!["my".to_string(), "batman".to_string()];
        let (u, v) = index.next_cover(&tokens, Position::Bof);
        assert_eq!(u, Position::at(1, 1));
        assert_eq!(v, Position::at(1, 4));

        let (u, v) = index.next_cover(&tokens, u);
        assert_eq!(u, Position::Eof);
        assert_eq!(v, Position::Eof);
    }

    fn window_covers(index: &InvertedIndex, tokens: &[String], doc: u32, a: u32, b: u32) -> bool {
        tokens.iter().all(|token| {
            let probe = if a == 0 {
                Position::at(doc.wrapping_sub(1), u32::MAX)
            } else {
                Position::at(doc, a - 1)
            };
            index
                .next(token, probe)
                .posting()
                .map(|p| p.doc_id == doc && p.offset <= b)
                .unwrap_or(false)
        })
    }

    #[test]
    fn test_cover_minimality() {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let mut index = InvertedIndex::new(analyzer, 11);
        index.index(1, "alpha beta alpha gamma beta alpha");

        let tokens = vec!["alpha".to_string(), "beta".to_string()];
        let mut cursor = Position::Bof;
        let mut covers = Vec::new();
        loop {
            let (u, v) = index.next_cover(&tokens, cursor);
            let (Position::At(up), Position::At(vp)) = (u, v) else {
                break;
            };
            covers.push((up, vp));
            cursor = u;
        }
        assert!(!covers.is_empty());

        for (up, vp) in covers {
            assert!(window_covers(&index, &tokens, up.doc_id, up.offset, vp.offset));
            // No strict sub-window of [u, v] contains every token.
            for a in up.offset..=vp.offset {
                for b in a..=vp.offset {
                    if (a, b) == (up.offset, vp.offset) {
                        continue;
                    }
                    assert!(
                        !window_covers(&index, &tokens, up.doc_id, a, b),
                        "[{a}, {b}] is a smaller cover inside [{}, {}]",
                        up.offset,
                        vp.offset
                    );
                }
            }
        }
    }

    #[test]
    fn test_rank_proximity_single_cover() {
        let index = batman_index();
        let matches = index.rank_proximity("save gotham", 10);

        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].offsets,
            vec![Posting::new(2, 4), Posting::new(2, 5)]
        );
        assert!((matches[0].score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rank_proximity_accumulates_per_document() {
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let mut index = InvertedIndex::new(analyzer, 11);
        index.index(1, "red blue red blue");
        index.index(2, "red something blue");

        let matches = index.rank_proximity("red blue", 10);
        assert_eq!(matches.len(), 2);

        // Doc 1: covers [0,1], [1,2], [2,3] each of width 2.
        assert_eq!(matches[0].doc_id(), Some(1));
        assert!((matches[0].score - 1.5).abs() < 1e-9);
        // Doc 2: one cover of width 3.
        assert_eq!(matches[1].doc_id(), Some(2));
        assert!((matches[1].score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_proximity_empty_query() {
        let index = batman_index();
        assert!(index.rank_proximity("", 10).is_empty());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let index = batman_index();
        let encoded = index.encode();

        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let decoded = InvertedIndex::decode(&encoded, analyzer, 11).unwrap();

        assert_eq!(decoded.token_count(), index.token_count());
        for (token, list) in &index.postings {
            let recovered = decoded.posting_list(token).unwrap();
            let original: Vec<Posting> = list.iter().collect();
            let round_tripped: Vec<Posting> = recovered.iter().collect();
            assert_eq!(original, round_tripped, "chain differs for {token:?}");
            for posting in original {
                assert_eq!(recovered.find(posting), Position::At(posting));
            }
        }
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let index = batman_index();
        let encoded = index.encode();
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());

        let err = InvertedIndex::decode(&encoded[..encoded.len() - 3], analyzer, 11);
        assert!(err.is_err());
    }

    #[test]
    fn test_queries_survive_round_trip() {
        let index = batman_index();
        let encoded = index.encode();
        let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
        let decoded = InvertedIndex::decode(&encoded, analyzer, 11).unwrap();

        let tokens = vec!["my".to_string(), "batman".to_string()];
        assert_eq!(
            decoded.next_cover(&tokens, Position::Bof),
            index.next_cover(&tokens, Position::Bof)
        );
        assert_eq!(
            decoded.rank_proximity("save gotham", 10),
            index.rank_proximity("save gotham", 10)
        );
    }
}
