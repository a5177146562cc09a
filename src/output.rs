//! Forward-pass output container.

use candle_core::Tensor;

/// Everything one forward call produces.
///
/// Produced fresh per call; the only long-lived state mutated across calls
/// is the head's linear weight, and only through the external optimizer.
#[derive(Debug, Clone)]
pub struct RearOutput {
    /// Combined (or sub-result) training loss. `None` when the call carried
    /// no labels for the computed branch.
    pub loss: Option<Tensor>,

    /// Vocabulary logits, `(batch, seq_len, vocab_size)`. Generation logits
    /// in the generation branch, gate-override logits in score-gated mode.
    pub logits: Option<Tensor>,

    /// One relevance score per sequence, `(batch,)`.
    pub rel_scores: Option<Tensor>,

    /// Per-layer hidden-state trace passed through from the backbone.
    pub hidden_states: Option<Tensor>,

    /// Attention trace passed through from the backbone.
    pub attentions: Option<Tensor>,
}

impl RearOutput {
    /// Extracts the loss as a plain `f32`, if present.
    pub fn loss_value(&self) -> candle_core::Result<Option<f32>> {
        match &self.loss {
            Some(loss) => Ok(Some(loss.to_scalar::<f32>()?)),
            None => Ok(None),
        }
    }

    /// Extracts the relevance scores as a plain vector, if present.
    pub fn rel_scores_vec(&self) -> candle_core::Result<Option<Vec<f32>>> {
        match &self.rel_scores {
            Some(scores) => Ok(Some(scores.to_vec1::<f32>()?)),
            None => Ok(None),
        }
    }
}
