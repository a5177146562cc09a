use thiserror::Error;

/// Errors that can occur while computing the ranking loss.
#[derive(Debug, Error)]
pub enum LossError {
    #[error("group size must be positive")]
    ZeroGroupSize,

    #[error("empty score batch")]
    EmptyBatch,

    #[error("score/label length mismatch: {scores} scores vs {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },

    #[error("batch of {len} examples is not divisible by group size {group_size}")]
    BatchNotDivisible { len: usize, group_size: usize },

    #[error("tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),
}
