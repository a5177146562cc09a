use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BETA, DEFAULT_COARSE_WEIGHT, DEFAULT_GEN_SCORE_TOKEN, DEFAULT_GROUP_SIZE,
    DEFAULT_IRRELEVANT_TOKEN, DEFAULT_MINOR_DIFF, DEFAULT_NEGATIVE_BIAS, DEFAULT_RELEVANT_TOKEN,
};
use crate::loss::RankingMode;

/// Objective selection for the head, fixed at construction.
///
/// This replaces a nullable combination weight: `Combined` carries the fixed
/// weight of the relevance loss, `ScoreGate` is the inference-only mode that
/// bypasses sampling by overwriting the logits at the sentinel position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Train both branches: `loss = generation + beta * relevance`.
    Combined { beta: f32 },
    /// Inference gate: force the relevant/irrelevant token based on whether
    /// the raw relevance score exceeds `threshold`.
    ScoreGate { threshold: f32 },
}

/// Scoring-head configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadConfig {
    /// Backbone hidden-state width.
    pub hidden_size: usize,

    /// Sentinel marking where the relevance score is read from.
    pub gen_score_token: u32,

    /// Token forced when a gated score clears the threshold.
    pub relevant_token: u32,

    /// Token forced when a gated score misses the threshold.
    pub irrelevant_token: u32,

    pub mode: ObjectiveMode,

    /// Use the pointwise-only warm-up objective.
    pub warm_up: bool,

    /// Candidates per query; relevance batches must divide evenly.
    pub group_size: usize,

    /// Minimum true-label gap for a pair to carry ranking signal.
    pub minor_diff_threshold: f32,

    /// Weight of the negative class in the pointwise term.
    pub negative_bias: f32,

    /// Weight of the pointwise term relative to the pairwise term.
    pub coarse_weight: f32,

    /// Multiplier applied to the projected relevance score.
    pub proj_scaler: f32,
}

impl HeadConfig {
    /// Defaults for a backbone of the given hidden width.
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            gen_score_token: DEFAULT_GEN_SCORE_TOKEN,
            relevant_token: DEFAULT_RELEVANT_TOKEN,
            irrelevant_token: DEFAULT_IRRELEVANT_TOKEN,
            mode: ObjectiveMode::Combined { beta: DEFAULT_BETA },
            warm_up: false,
            group_size: DEFAULT_GROUP_SIZE,
            minor_diff_threshold: DEFAULT_MINOR_DIFF,
            negative_bias: DEFAULT_NEGATIVE_BIAS,
            coarse_weight: DEFAULT_COARSE_WEIGHT,
            proj_scaler: 1.0,
        }
    }

    pub fn with_mode(mut self, mode: ObjectiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sentinels(mut self, gen_score: u32, relevant: u32, irrelevant: u32) -> Self {
        self.gen_score_token = gen_score;
        self.relevant_token = relevant;
        self.irrelevant_token = irrelevant;
        self
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn with_minor_diff_threshold(mut self, threshold: f32) -> Self {
        self.minor_diff_threshold = threshold;
        self
    }

    pub fn with_negative_bias(mut self, bias: f32) -> Self {
        self.negative_bias = bias;
        self
    }

    pub fn with_coarse_weight(mut self, weight: f32) -> Self {
        self.coarse_weight = weight;
        self
    }

    pub fn with_proj_scaler(mut self, scaler: f32) -> Self {
        self.proj_scaler = scaler;
        self
    }

    /// Checks basic invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.hidden_size == 0 {
            return Err("hidden_size cannot be zero".to_string());
        }
        if self.group_size == 0 {
            return Err("group_size cannot be zero".to_string());
        }
        if self.negative_bias < 0.0 {
            return Err(format!(
                "negative_bias must be non-negative, got {}",
                self.negative_bias
            ));
        }
        if self.relevant_token == self.irrelevant_token {
            return Err("relevant_token and irrelevant_token must differ".to_string());
        }
        if let ObjectiveMode::Combined { beta } = self.mode
            && !beta.is_finite()
        {
            return Err(format!("beta must be finite, got {beta}"));
        }
        Ok(())
    }

    pub(crate) fn ranking_mode(&self) -> RankingMode {
        if self.warm_up {
            RankingMode::WarmUp
        } else {
            RankingMode::Full
        }
    }
}
