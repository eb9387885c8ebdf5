use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Tokenizer output for a single document, special tokens included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub type_ids: Vec<u32>,
    /// Whether tokens past the sequence limit were dropped.
    pub truncated: bool,
}

impl TokenizedInput {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Raw encoder result.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    /// Shape `(batch, seq_len, hidden_size)`.
    pub last_hidden_state: Tensor,
}

/// Embedding output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// Hidden state of the first token.
    pub vector: Vec<f32>,
    /// Repository id of the model that produced the vector.
    pub model_id: String,
    /// Dimension of `vector`.
    pub embedding_dim: usize,
    /// Tokens fed to the encoder after truncation.
    pub token_count: usize,
    /// Whether the document was cut to fit the sequence limit.
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenized_input_len() {
        let input = TokenizedInput {
            ids: vec![0, 5, 2],
            attention_mask: vec![1, 1, 1],
            type_ids: vec![0, 0, 0],
            truncated: false,
        };
        assert_eq!(input.len(), 3);
        assert!(!input.is_empty());
    }

    #[test]
    fn embedding_serializes_metadata() {
        let embedding = Embedding {
            vector: vec![0.25, -0.5],
            model_id: "stub".into(),
            embedding_dim: 2,
            token_count: 7,
            truncated: false,
        };
        let json = serde_json::to_value(&embedding).unwrap();
        assert_eq!(json["embedding_dim"], 2);
        assert_eq!(json["vector"][1], -0.5);
    }
}
