//! Grouped ranking objective over candidate-passage scores.
//!
//! The engine combines two terms:
//!
//! - a **pairwise** (RankNet-style) term over every ordered pair of
//!   candidates inside a query group, restricted to pairs whose true-label
//!   gap is wide enough to carry ranking signal, and
//! - a **pointwise** calibration term that pushes positives (`label >= 0.5`)
//!   towards 1 and negatives towards 0, with a configurable weight on the
//!   negative class to compensate for class imbalance.
//!
//! Labels are continuous relevance grades in `[0, 1]`; an infinite label
//! marks a "no signal" candidate and is excluded from pairwise comparison.

pub mod error;


pub use error::LossError;

use candle_core::{DType, Tensor};
use tracing::debug;

use crate::constants::PAIRWISE_WEIGHT;

/// Objective selection, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    /// Pointwise term only. Used for the initial training phase.
    WarmUp,
    /// `0.5 * pairwise + coarse_weight * pointwise`.
    Full,
}

/// Pairwise + pointwise ranking loss over fixed-size candidate groups.
#[derive(Debug, Clone)]
pub struct RankingLoss {
    mode: RankingMode,
    group_size: usize,
    negative_bias: f32,
    minor_diff_threshold: f32,
    coarse_weight: f32,
}

impl RankingLoss {
    /// Creates a new engine.
    ///
    /// `group_size` is the number of candidates per query; every batch passed
    /// to [`evaluate`](Self::evaluate) must have a length divisible by it.
    pub fn new(
        mode: RankingMode,
        group_size: usize,
        negative_bias: f32,
        minor_diff_threshold: f32,
        coarse_weight: f32,
    ) -> Result<Self, LossError> {
        if group_size == 0 {
            return Err(LossError::ZeroGroupSize);
        }

        Ok(Self {
            mode,
            group_size,
            negative_bias,
            minor_diff_threshold,
            coarse_weight,
        })
    }

    pub fn mode(&self) -> RankingMode {
        self.mode
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Computes the scalar loss for a batch of scores and relevance labels.
    ///
    /// Both tensors must be rank-1 and of equal length; the length must be a
    /// positive multiple of the group size. Inputs are upcast to `f32`.
    pub fn evaluate(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor, LossError> {
        let n = scores.dims1()?;
        let m = labels.dims1()?;
        if n != m {
            return Err(LossError::LengthMismatch {
                scores: n,
                labels: m,
            });
        }
        if n == 0 {
            return Err(LossError::EmptyBatch);
        }
        if !n.is_multiple_of(self.group_size) {
            return Err(LossError::BatchNotDivisible {
                len: n,
                group_size: self.group_size,
            });
        }

        let scores = scores.to_dtype(DType::F32)?;
        let labels = labels.to_dtype(DType::F32)?;

        match self.mode {
            RankingMode::WarmUp => self.pointwise(&scores, &labels),
            RankingMode::Full => {
                let fine = self.pairwise(&scores, &labels)?;
                let coarse = self.pointwise(&scores, &labels)?;
                let combined = fine
                    .affine(PAIRWISE_WEIGHT, 0.0)?
                    .add(&coarse.affine(self.coarse_weight as f64, 0.0)?)?;
                Ok(combined)
            }
        }
    }

    /// RankNet-style term over the full ordered-pair grid of each group.
    ///
    /// Every ordered pair `(i, j)` (self-pairs included) is enumerated; a
    /// pair survives when `label[i] - label[j] > minor_diff_threshold` and
    /// the gap is finite. Survivors are binarized to `{0, 1}` targets and
    /// scored with BCE-with-logits on the prediction gap, mean-reduced over
    /// survivors across the whole batch.
    ///
    /// A batch where every pair is filtered out contributes exactly zero.
    fn pairwise(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor, LossError> {
        let n = scores.dims1()?;
        let groups = n / self.group_size;

        let y_pred = scores.reshape((groups, self.group_size))?;
        let y_true = labels.reshape((groups, self.group_size))?;

        // diff[g, i, j] = x[g, i] - x[g, j]
        let true_diffs = y_true.unsqueeze(2)?.broadcast_sub(&y_true.unsqueeze(1)?)?;
        let pred_diffs = y_pred.unsqueeze(2)?.broadcast_sub(&y_pred.unsqueeze(1)?)?;

        // Infinite labels produce an infinite (or NaN) gap; both compare
        // false against the finite bound and drop out of the mask.
        let ordered = true_diffs.gt(self.minor_diff_threshold as f64)?.to_dtype(DType::F32)?;
        let finite = true_diffs.abs()?.lt(f64::INFINITY)?.to_dtype(DType::F32)?;
        let mask = ordered.mul(&finite)?;

        let kept = mask.sum_all()?.to_scalar::<f32>()?;
        if kept == 0.0 {
            debug!(
                groups,
                group_size = self.group_size,
                "no pairs survived filtering, pairwise term is zero"
            );
            return Ok(Tensor::zeros((), DType::F32, scores.device())?);
        }

        let targets = true_diffs.gt(0.0)?.to_dtype(DType::F32)?;
        let per_pair = bce_with_logits(&pred_diffs, &targets)?;
        let total = per_pair.mul(&mask)?.sum_all()?;

        Ok(total.affine(1.0 / kept as f64, 0.0)?)
    }

    /// Bias-weighted pointwise calibration term.
    ///
    /// Positives (`label >= 0.5`) are scored against an all-ones target,
    /// negatives against all-zeros scaled by `negative_bias`; both are
    /// sum-reduced and divided by the total batch length. An empty class
    /// simply contributes nothing.
    fn pointwise(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor, LossError> {
        let n = scores.dims1()?;

        let pos_mask = labels.ge(0.5)?.to_dtype(DType::F32)?;
        let neg_mask = pos_mask.affine(-1.0, 1.0)?;

        let pos_term = bce_with_logits(scores, &scores.ones_like()?)?;
        let neg_term = bce_with_logits(scores, &scores.zeros_like()?)?;

        let pos_sum = pos_term.mul(&pos_mask)?.sum_all()?;
        let neg_sum = neg_term.mul(&neg_mask)?.sum_all()?;

        let total = pos_sum.add(&neg_sum.affine(self.negative_bias as f64, 0.0)?)?;
        Ok(total.affine(1.0 / n as f64, 0.0)?)
    }
}

/// Elementwise binary cross entropy with logits.
///
/// Stable formulation: `max(x, 0) - x*z + ln(1 + exp(-|x|))`.
fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let hinge = logits.relu()?;
    let prod = logits.mul(targets)?;
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    hinge.sub(&prod)?.add(&softplus)
}
