//! Relevance scoring head over a causal-LM backbone.
//!
//! The head owns one bias-free linear projection from hidden width to a
//! scalar relevance score, plus the [`RankingLoss`] engine. It drives a
//! forward pass over a [`Backbone`] and, depending on the configured
//! [`ObjectiveMode`], either fuses the generation and relevance losses or
//! gates decoding on the learned score.

pub mod config;
pub mod error;


pub use config::{HeadConfig, ObjectiveMode};
pub use error::HeadError;

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use tracing::{debug, info, warn};

use crate::backbone::{Backbone, BackboneStates};
use crate::constants::{GATE_LOGIT_HIGH, GATE_LOGIT_LOW};
use crate::loss::RankingLoss;
use crate::output::RearOutput;

/// Variable path of the learned projection inside checkpoints.
pub const REL_SCORE_VAR: &str = "rel_score";

struct GenerationResult {
    logits: Tensor,
    loss: Option<Tensor>,
}

struct RelevanceResult {
    scores: Tensor,
    loss: Option<Tensor>,
    gate_logits: Option<Tensor>,
}

/// Scoring head: sentinel-position score extraction plus the combined
/// ranking/generation objective.
pub struct ScoringHead {
    rel_score: Linear,
    rank_loss: RankingLoss,
    config: HeadConfig,
}

impl std::fmt::Debug for ScoringHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringHead")
            .field("config", &self.config)
            .finish()
    }
}

impl ScoringHead {
    /// Builds the head, creating (or picking up) the `rel_score` weight
    /// through the given `VarBuilder`.
    ///
    /// Pass a `VarBuilder` backed by a `VarMap` to make the projection
    /// trainable by an external optimizer.
    pub fn new(vb: VarBuilder, config: HeadConfig) -> Result<Self, HeadError> {
        if let Err(reason) = config.validate() {
            return Err(HeadError::InvalidConfig { reason });
        }

        let rel_score = candle_nn::linear_no_bias(config.hidden_size, 1, vb.pp(REL_SCORE_VAR))?;
        let rank_loss = RankingLoss::new(
            config.ranking_mode(),
            config.group_size,
            config.negative_bias,
            config.minor_diff_threshold,
            config.coarse_weight,
        )?;

        info!(
            hidden_size = config.hidden_size,
            group_size = config.group_size,
            mode = ?config.mode,
            warm_up = config.warm_up,
            "Initialized scoring head"
        );

        Ok(Self {
            rel_score,
            rank_loss,
            config,
        })
    }

    /// Loads a head from a directory holding `head_config.json` and
    /// `head.safetensors` (with the weight under `rel_score.weight`).
    pub fn load<P: AsRef<Path>>(dir: P, device: &Device) -> Result<Self, HeadError> {
        let dir = dir.as_ref();
        let config_path = dir.join("head_config.json");
        let weights_path = dir.join("head.safetensors");

        if !config_path.exists() {
            return Err(HeadError::LoadFailed {
                reason: format!("missing head_config.json in {}", dir.display()),
            });
        }
        if !weights_path.exists() {
            return Err(HeadError::LoadFailed {
                reason: format!("missing head.safetensors in {}", dir.display()),
            });
        }

        let config_content = std::fs::read_to_string(&config_path)?;
        let config: HeadConfig =
            serde_json::from_str(&config_content).map_err(|e| HeadError::LoadFailed {
                reason: format!("failed to parse head_config.json: {e}"),
            })?;

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };

        info!(dir = %dir.display(), "Loading scoring head weights");
        Self::new(vb, config)
    }

    pub fn config(&self) -> &HeadConfig {
        &self.config
    }

    /// Runs one forward pass.
    ///
    /// `input_ids` are `u32` token ids of shape `(batch, seq_len)`. `labels`
    /// are next-token targets for the generation branch (same shape,
    /// teacher-forced with a one-position shift); `relevance_labels` are
    /// per-sequence relevance grades, `(batch,)`, grouped by the configured
    /// group size. Either label tensor may be absent; the matching loss is
    /// then skipped.
    pub fn forward(
        &self,
        backbone: &dyn Backbone,
        input_ids: &Tensor,
        attention_mask: Option<&Tensor>,
        labels: Option<&Tensor>,
        relevance_labels: Option<&Tensor>,
    ) -> Result<RearOutput, HeadError> {
        let states = backbone.forward(input_ids, attention_mask)?;

        match self.config.mode {
            ObjectiveMode::ScoreGate { threshold } => {
                // The first sequence decides the branch: the presence of a
                // relevance verdict token means we are decoding an answer.
                let first_row = input_ids.i(0)?.to_dtype(DType::U32)?.to_vec1::<u32>()?;
                let answering = first_row.iter().any(|&t| {
                    t == self.config.relevant_token || t == self.config.irrelevant_token
                });

                if answering {
                    debug!("gate mode: verdict token present, generation branch");
                    let gen_out = self.generation(backbone, &states, labels)?;
                    Ok(RearOutput {
                        loss: gen_out.loss,
                        logits: Some(gen_out.logits),
                        rel_scores: None,
                        hidden_states: states.hidden_trace,
                        attentions: states.attentions,
                    })
                } else {
                    debug!("gate mode: scoring branch");
                    let rel = self.relevance(
                        &states,
                        input_ids,
                        relevance_labels,
                        Some(threshold),
                        backbone.vocab_size(),
                    )?;
                    Ok(RearOutput {
                        loss: rel.loss,
                        logits: rel.gate_logits,
                        rel_scores: Some(rel.scores),
                        hidden_states: states.hidden_trace,
                        attentions: states.attentions,
                    })
                }
            }
            ObjectiveMode::Combined { beta } => {
                let gen_out = self.generation(backbone, &states, labels)?;
                let rel =
                    self.relevance(&states, input_ids, relevance_labels, None, backbone.vocab_size())?;

                // Without generation labels the generation term is a zero
                // scalar; without relevance labels there is no loss at all.
                let loss = match rel.loss {
                    Some(rel_loss) => {
                        let gen_loss = match gen_out.loss {
                            Some(loss) => loss,
                            None => {
                                Tensor::zeros((), DType::F32, states.hidden_states.device())?
                            }
                        };
                        Some(gen_loss.add(&rel_loss.affine(beta as f64, 0.0)?)?)
                    }
                    None => None,
                };

                Ok(RearOutput {
                    loss,
                    logits: Some(gen_out.logits),
                    rel_scores: Some(rel.scores),
                    hidden_states: states.hidden_trace,
                    attentions: states.attentions,
                })
            }
        }
    }

    /// Generation branch: LM-head logits and, with labels, the standard
    /// shifted next-token cross entropy.
    fn generation(
        &self,
        backbone: &dyn Backbone,
        states: &BackboneStates,
        labels: Option<&Tensor>,
    ) -> Result<GenerationResult, HeadError> {
        let logits = backbone
            .project_to_vocab(&states.hidden_states)?
            .to_dtype(DType::F32)?;

        let loss = match labels {
            Some(labels) => {
                let (batch, seq_len, vocab) = logits.dims3()?;
                if seq_len < 2 {
                    return Err(HeadError::SequenceTooShort { len: seq_len });
                }

                // Logits at position t predict the token at t + 1.
                let shift_logits = logits
                    .narrow(1, 0, seq_len - 1)?
                    .reshape((batch * (seq_len - 1), vocab))?;
                let shift_labels = labels
                    .narrow(1, 1, seq_len - 1)?
                    .reshape((batch * (seq_len - 1),))?;

                Some(candle_nn::loss::cross_entropy(
                    &shift_logits,
                    &shift_labels,
                )?)
            }
            None => None,
        };

        Ok(GenerationResult { logits, loss })
    }

    /// Relevance branch: locate the scoring sentinel per sequence, project
    /// that hidden vector to a scalar score, and optionally evaluate the
    /// ranking loss and build the gate-override logits.
    fn relevance(
        &self,
        states: &BackboneStates,
        input_ids: &Tensor,
        relevance_labels: Option<&Tensor>,
        gate_threshold: Option<f32>,
        vocab_size: usize,
    ) -> Result<RelevanceResult, HeadError> {
        let hidden = &states.hidden_states;
        let (batch, seq_len, _hidden) = hidden.dims3()?;

        let rows = input_ids.to_dtype(DType::U32)?.to_vec2::<u32>()?;
        let mut positions = Vec::with_capacity(batch);
        for (row, ids) in rows.iter().enumerate() {
            match ids.iter().position(|&t| t == self.config.gen_score_token) {
                Some(pos) => positions.push(pos),
                None => {
                    // Latent correctness risk inherited from the reference
                    // behavior: the score is read from position 0.
                    warn!(
                        row,
                        token = self.config.gen_score_token,
                        "scoring sentinel absent from sequence, reading position 0"
                    );
                    positions.push(0);
                }
            }
        }

        let mut gathered = Vec::with_capacity(batch);
        for (row, &pos) in positions.iter().enumerate() {
            gathered.push(hidden.i((row, pos, ..))?);
        }
        let rel_hidden = Tensor::stack(&gathered, 0)?;

        let scores = self
            .rel_score
            .forward(&rel_hidden)?
            .squeeze(1)?
            .to_dtype(DType::F32)?;
        let scores = if self.config.proj_scaler != 1.0 {
            scores.affine(self.config.proj_scaler as f64, 0.0)?
        } else {
            scores
        };

        let loss = match relevance_labels {
            Some(labels) => Some(self.rank_loss.evaluate(&scores, labels)?),
            None => None,
        };

        let gate_logits = match gate_threshold {
            Some(threshold) => {
                Some(self.gate_logits(&scores, &positions, seq_len, vocab_size, threshold)?)
            }
            None => None,
        };

        Ok(RelevanceResult {
            scores,
            loss,
            gate_logits,
        })
    }

    /// Builds the logits tensor that forces a deterministic relevant or
    /// irrelevant verdict at each sequence's sentinel position.
    fn gate_logits(
        &self,
        scores: &Tensor,
        positions: &[usize],
        seq_len: usize,
        vocab_size: usize,
        threshold: f32,
    ) -> Result<Tensor, HeadError> {
        let verdict_max = self.config.relevant_token.max(self.config.irrelevant_token) as usize;
        if verdict_max >= vocab_size {
            return Err(HeadError::InvalidConfig {
                reason: format!(
                    "verdict token {verdict_max} is outside the vocabulary of size {vocab_size}"
                ),
            });
        }

        let score_vals = scores.to_vec1::<f32>()?;
        let batch = score_vals.len();

        let mut data = vec![GATE_LOGIT_LOW; batch * seq_len * vocab_size];
        for (row, (&score, &pos)) in score_vals.iter().zip(positions).enumerate() {
            let forced = if score > threshold {
                self.config.relevant_token
            } else {
                self.config.irrelevant_token
            };
            data[(row * seq_len + pos) * vocab_size + forced as usize] = GATE_LOGIT_HIGH;

            debug!(row, score, threshold, forced, "gate verdict");
        }

        Ok(Tensor::from_vec(
            data,
            (batch, seq_len, vocab_size),
            scores.device(),
        )?)
    }
}
