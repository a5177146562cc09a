use thiserror::Error;

use crate::loss::LossError;

/// Errors that can occur while building or running the scoring head.
#[derive(Debug, Error)]
pub enum HeadError {
    #[error("invalid head configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to load scoring head: {reason}")]
    LoadFailed { reason: String },

    #[error("sequence of length {len} is too short for next-token loss")]
    SequenceTooShort { len: usize },

    #[error("ranking loss failed: {0}")]
    Loss(#[from] LossError),

    #[error("tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl From<std::io::Error> for HeadError {
    fn from(err: std::io::Error) -> Self {
        HeadError::LoadFailed {
            reason: err.to_string(),
        }
    }
}
