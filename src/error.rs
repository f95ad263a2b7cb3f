use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum SepiaError {
    #[error("document of {size} bytes exceeds the memtable limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("segment codec error: {0}")]
    Codec(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("command decode error: {0}")]
    Command(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SepiaError>;

impl SepiaError {
    /// Check if the engine remains usable after this error surfaced to the
    /// caller. Codec failures at startup and internal invariant breaks are not
    /// recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SepiaError::InputTooLarge { .. }
                | SepiaError::Embedding(_)
                | SepiaError::Command(_)
                | SepiaError::Io(_)
        )
    }
}
