//! Deterministic in-memory backbone for tests.

use candle_core::{DType, Device, Result, Tensor};

use super::{Backbone, BackboneStates};

/// Backbone stub with predictable hidden states and a zero LM head.
///
/// By default every hidden vector encodes its own coordinates:
/// `hidden[b, t, k] = b * 100 + t + k / 1000`, which makes gather mistakes
/// show up as large score errors. A preset tensor can be injected instead
/// via [`with_hidden`](Self::with_hidden).
///
/// The vocabulary projection returns all-zero logits, so the shifted
/// next-token cross entropy is exactly `ln(vocab_size)` whenever labels are
/// supplied. Tests lean on that closed form.
pub struct MockBackbone {
    hidden_size: usize,
    vocab_size: usize,
    device: Device,
    preset_hidden: Option<Tensor>,
}

impl MockBackbone {
    pub fn new(hidden_size: usize, vocab_size: usize, device: &Device) -> Self {
        Self {
            hidden_size,
            vocab_size,
            device: device.clone(),
            preset_hidden: None,
        }
    }

    /// Replaces the generated hidden states with an exact tensor of shape
    /// `(batch, seq_len, hidden_size)`.
    pub fn with_hidden(mut self, hidden: Tensor) -> Self {
        self.preset_hidden = Some(hidden);
        self
    }
}

impl Backbone for MockBackbone {
    fn forward(
        &self,
        input_ids: &Tensor,
        _attention_mask: Option<&Tensor>,
    ) -> Result<BackboneStates> {
        if let Some(hidden) = &self.preset_hidden {
            return Ok(BackboneStates::new(hidden.clone()));
        }

        let (batch, seq_len) = input_ids.dims2()?;
        let mut data = Vec::with_capacity(batch * seq_len * self.hidden_size);
        for b in 0..batch {
            for t in 0..seq_len {
                for k in 0..self.hidden_size {
                    data.push(b as f32 * 100.0 + t as f32 + k as f32 / 1000.0);
                }
            }
        }
        let hidden = Tensor::from_vec(data, (batch, seq_len, self.hidden_size), &self.device)?;
        Ok(BackboneStates::new(hidden))
    }

    fn project_to_vocab(&self, hidden_states: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _hidden) = hidden_states.dims3()?;
        Tensor::zeros((batch, seq_len, self.vocab_size), DType::F32, &self.device)
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}
