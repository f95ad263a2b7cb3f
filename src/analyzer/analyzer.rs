use std::collections::HashSet;

use crate::config::AnalyzerConfig;

/// A normalized term and its position in the raw token stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: u32,
}

/// Text analyzer: folds to lowercase, splits on non-alphanumeric runs, drops
/// empty tokens and stopwords. Pure and deterministic.
///
/// Positions index the raw token stream, so dropping a stopword never
/// renumbers the tokens that survive it.
#[derive(Clone, Debug)]
pub struct Analyzer {
    lowercase: bool,
    stopwords: HashSet<String>,
}

impl Analyzer {
    /// Create a new analyzer from configuration
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            lowercase: config.lowercase,
            stopwords: config.stopwords.iter().cloned().collect(),
        }
    }

    /// Analyze text into positioned terms
    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (position, raw) in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .enumerate()
        {
            let term = if self.lowercase {
                raw.to_lowercase()
            } else {
                raw.to_string()
            };

            if self.stopwords.contains(&term) {
                continue;
            }

            tokens.push(Token {
                term,
                position: position as u32,
            });
        }
        tokens
    }

    /// Terms only, in stream order; the query-side view of [`analyze`]
    ///
    /// [`analyze`]: Analyzer::analyze
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.term).collect()
    }
}
