use thiserror::Error;

/// Failures the scoring engine can produce, from request validation
/// through remote calls to final assembly.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("item at position {position} has no text to classify")]
    MissingText { position: usize },

    #[error("assistant request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("assistant returned status {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("intent {intent:?} is not in the label vocabulary")]
    UnknownLabel { intent: String },

    #[error("no result for chunk {index}")]
    MissingSlot { index: usize },

    #[error("worker pool is not running")]
    PoolClosed,
}

impl EngineError {
    /// Whether the caller, not this service or the assistant, is at fault.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::MissingText { .. } | Self::InvalidChunkSize)
    }
}
