mod analyzer;

pub use analyzer::{Analyzer, Token};
