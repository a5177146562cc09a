//! Cross-cutting, shared defaults.
//!
//! Sentinel token ids follow the extended-vocabulary convention of the
//! reference checkpoints (three tokens appended past the base 32k vocab).
//! Override them through [`HeadConfig`](crate::HeadConfig) when training with
//! a different tokenizer.

/// Token whose position marks where the relevance score is read from.
pub const DEFAULT_GEN_SCORE_TOKEN: u32 = 32002;

/// Token emitted for a relevant passage in gated decoding.
pub const DEFAULT_RELEVANT_TOKEN: u32 = 32001;

/// Token emitted for an irrelevant passage in gated decoding.
pub const DEFAULT_IRRELEVANT_TOKEN: u32 = 32003;

/// Default number of candidate passages per query.
pub const DEFAULT_GROUP_SIZE: usize = 8;

/// Default weight of the relevance loss inside the combined objective.
pub const DEFAULT_BETA: f32 = 0.5;

/// Default weight applied to the negative class in the pointwise term.
pub const DEFAULT_NEGATIVE_BIAS: f32 = 1.0;

/// Default minimum true-label gap for a pair to carry ranking signal.
pub const DEFAULT_MINOR_DIFF: f32 = 0.0;

/// Default weight of the pointwise term relative to the pairwise term.
pub const DEFAULT_COARSE_WEIGHT: f32 = 0.5;

/// Fixed weight of the pairwise term in the full objective.
pub const PAIRWISE_WEIGHT: f64 = 0.5;

/// Default raw-score threshold for the score-gated decoding mode.
pub const DEFAULT_GATE_THRESHOLD: f32 = 13.0;

/// Logit written everywhere except the forced token in gated decoding.
pub const GATE_LOGIT_LOW: f32 = -100.0;

/// Logit written at the forced token position in gated decoding.
pub const GATE_LOGIT_HIGH: f32 = 100.0;
