//! Seam between the scoring head and the pretrained causal LM.
//!
//! The head never touches backbone internals; it consumes hidden states and
//! the backbone-owned vocabulary projection through this trait. Any candle
//! causal LM can be adapted by implementing [`Backbone`] on a thin wrapper.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockBackbone;

use candle_core::{Result, Tensor};

/// Artifacts produced by one backbone pass.
#[derive(Debug, Clone)]
pub struct BackboneStates {
    /// Final-layer hidden states, shape `(batch, seq_len, hidden_size)`.
    pub hidden_states: Tensor,

    /// Optional per-layer hidden-state trace, passed through untouched.
    pub hidden_trace: Option<Tensor>,

    /// Optional attention trace, passed through untouched.
    pub attentions: Option<Tensor>,
}

impl BackboneStates {
    /// States with no optional traces.
    pub fn new(hidden_states: Tensor) -> Self {
        Self {
            hidden_states,
            hidden_trace: None,
            attentions: None,
        }
    }
}

/// A hidden-state-producing capability plus its language-modeling head.
pub trait Backbone {
    /// Runs the sequence model over `input_ids` (`u32`, shape
    /// `(batch, seq_len)`) with an optional attention mask of the same shape.
    fn forward(&self, input_ids: &Tensor, attention_mask: Option<&Tensor>)
    -> Result<BackboneStates>;

    /// Projects hidden states to per-token vocabulary logits with the
    /// backbone-owned LM head, `(batch, seq_len, hidden_size)` to
    /// `(batch, seq_len, vocab_size)`.
    fn project_to_vocab(&self, hidden_states: &Tensor) -> Result<Tensor>;

    /// Width of the hidden-state vectors.
    fn hidden_size(&self) -> usize;

    /// Size of the output vocabulary.
    fn vocab_size(&self) -> usize;
}
