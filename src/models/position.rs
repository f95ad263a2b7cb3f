use serde::{Deserialize, Serialize};

/// Unique document identifier. The on-disk codec stores 32-bit ids, so the
/// engine uses the same width end to end.
pub type DocumentId = u32;

/// One token occurrence: which document, and at which token offset.
///
/// Order is lexicographic on `(doc_id, offset)`; the derived `Ord` relies on
/// field declaration order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Posting {
    pub doc_id: DocumentId,
    pub offset: u32,
}

impl Posting {
    pub fn new(doc_id: DocumentId, offset: u32) -> Self {
        Self { doc_id, offset }
    }
}

/// A point in the ordered posting universe, bounded below and above by
/// sentinels: `Bof` sorts before every real posting and `Eof` after.
///
/// `Eof` doubles as the not-found result of the ordered lookups; it is never
/// an error condition.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Position {
    Bof,
    At(Posting),
    Eof,
}

impl Position {
    pub fn at(doc_id: DocumentId, offset: u32) -> Self {
        Position::At(Posting::new(doc_id, offset))
    }

    /// The concrete posting, if this position is not a sentinel
    pub fn posting(self) -> Option<Posting> {
        match self {
            Position::At(posting) => Some(posting),
            _ => None,
        }
    }

    pub fn doc_id(self) -> Option<DocumentId> {
        self.posting().map(|p| p.doc_id)
    }

    pub fn is_bof(self) -> bool {
        self == Position::Bof
    }

    pub fn is_eof(self) -> bool {
        self == Position::Eof
    }
}

/// A ranked hit. Lexical hits carry the cover window `[start, end]`; semantic
/// hits carry a single `{doc_id, 0}` posting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub offsets: Vec<Posting>,
    pub score: f64,
}

impl Match {
    pub fn new(offsets: Vec<Posting>, score: f64) -> Self {
        Self { offsets, score }
    }

    /// The document this hit identifies
    pub fn doc_id(&self) -> Option<DocumentId> {
        self.offsets.first().map(|p| p.doc_id)
    }
}
