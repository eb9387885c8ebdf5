use candle_core::{Device, Tensor};
use fxhash::hash64;

use crate::encoder::Encoder;
use crate::types::{EncoderOutput, TokenizedInput};
use crate::EmbedError;

/// Deterministic encoder used when `backend = "stub"`.
/// Hidden states are sinusoids derived from a hash of the whole (already truncated) id sequence,
/// the token position and the dimension, so every value depends on every token the encoder is
/// given, and on nothing else.
#[derive(Debug, Clone)]
pub struct StubEncoder {
    hidden_size: usize,
}

impl StubEncoder {
    pub fn new(hidden_size: usize) -> Self {
        Self { hidden_size }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

impl Encoder for StubEncoder {
    fn forward(&self, input: &TokenizedInput) -> Result<EncoderOutput, EmbedError> {
        if input.is_empty() {
            return Err(EmbedError::Inference("tokenizer produced no tokens".into()));
        }

        let seq_len = input.len();
        let sequence_hash = hash64(input.ids.as_slice());
        let mut states = Vec::with_capacity(seq_len * self.hidden_size);
        for position in 0..seq_len {
            for idx in 0..self.hidden_size {
                let h = hash64(&(sequence_hash, position, idx));
                states.push(((h >> 32) as f32 * 0.0001).sin());
            }
        }

        let last_hidden_state =
            Tensor::from_vec(states, (1, seq_len, self.hidden_size), &Device::Cpu)
                .map_err(|e| EmbedError::Inference(e.to_string()))?;
        Ok(EncoderOutput { last_hidden_state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::first_token_state;

    fn input(ids: Vec<u32>) -> TokenizedInput {
        let n = ids.len();
        TokenizedInput {
            ids,
            attention_mask: vec![1; n],
            type_ids: vec![0; n],
            truncated: false,
        }
    }

    #[test]
    fn stub_output_shape() {
        let encoder = StubEncoder::new(16);
        let out = encoder.forward(&input(vec![0, 10, 11, 2])).unwrap();
        assert_eq!(out.last_hidden_state.dims(), &[1, 4, 16]);
    }

    #[test]
    fn stub_is_deterministic() {
        let encoder = StubEncoder::new(32);
        let a = first_token_state(&encoder.forward(&input(vec![0, 7, 2])).unwrap()).unwrap();
        let b = first_token_state(&encoder.forward(&input(vec![0, 7, 2])).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stub_first_token_depends_on_later_tokens() {
        let encoder = StubEncoder::new(32);
        let a = first_token_state(&encoder.forward(&input(vec![0, 7, 2])).unwrap()).unwrap();
        let b = first_token_state(&encoder.forward(&input(vec![0, 8, 2])).unwrap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn stub_values_are_finite() {
        let encoder = StubEncoder::new(768);
        let v = first_token_state(&encoder.forward(&input(vec![0, 1, 2, 3])).unwrap()).unwrap();
        assert_eq!(v.len(), 768);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn stub_rejects_empty_input() {
        let encoder = StubEncoder::new(8);
        assert!(encoder.forward(&input(Vec::new())).is_err());
    }

    #[test]
    fn stub_dimensions_vary_independently() {
        let encoder = StubEncoder::new(768);
        assert_eq!(encoder.hidden_size(), 768);
        let mut v = first_token_state(&encoder.forward(&input(vec![0, 4, 2])).unwrap()).unwrap();
        v.sort_by(f32::total_cmp);
        v.dedup();
        assert!(v.len() > 700, "only {} distinct values", v.len());
    }
}
