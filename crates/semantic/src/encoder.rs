use std::fs;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as RobertaConfig, XLMRobertaModel};
use serde_json::Value;
use tracing::{debug, warn};

use crate::assets::{ModelAssets, WeightsFile};
use crate::types::{EncoderOutput, TokenizedInput};
use crate::EmbedError;

/// A pretrained encoder mapping one token sequence to one hidden state per token.
pub trait Encoder {
    /// Runs inference on a single sequence. Implementations must not update parameters.
    fn forward(&self, input: &TokenizedInput) -> Result<EncoderOutput, EmbedError>;
}

/// Selects the hidden state of the first token of the first sequence (`last_hidden_state[0][0]`).
pub fn first_token_state(output: &EncoderOutput) -> Result<Vec<f32>, EmbedError> {
    let (batch, seq_len, hidden) = output
        .last_hidden_state
        .dims3()
        .map_err(|e| EmbedError::Inference(format!("unexpected hidden state shape: {e}")))?;
    if batch == 0 || seq_len == 0 || hidden == 0 {
        return Err(EmbedError::Inference(format!(
            "empty hidden state ({batch}, {seq_len}, {hidden})"
        )));
    }

    output
        .last_hidden_state
        .i((0, 0))
        .and_then(|row| row.to_dtype(DType::F32))
        .and_then(|row| row.to_vec1::<f32>())
        .map_err(|e| EmbedError::Inference(e.to_string()))
}

pub(crate) fn select_device(name: &str) -> Result<Device, EmbedError> {
    match name {
        "cpu" => Ok(Device::Cpu),
        "cuda" => {
            let device =
                Device::cuda_if_available(0).map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
            if device.is_cpu() {
                warn!("CUDA not available, falling back to CPU");
            }
            Ok(device)
        }
        other => Err(EmbedError::InvalidConfig(format!("unknown device {other:?}"))),
    }
}

/// BERT-family encoder (BERT, RoBERTa/CodeBERT) running on candle.
///
/// `config.json` picks the architecture: `model_type = "roberta"` numbers positions from
/// `pad_token_id + 1` the way RoBERTa checkpoints were trained, anything else runs as plain BERT.
pub struct BertEncoder {
    model: Architecture,
    device: Device,
}

enum Architecture {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

impl BertEncoder {
    pub(crate) fn load(assets: &ModelAssets, device: Device) -> Result<Self, EmbedError> {
        let raw = fs::read_to_string(&assets.config_path)?;
        let config: Value = serde_json::from_str(&raw).map_err(|e| {
            EmbedError::ModelLoad(format!("{}: {e}", assets.config_path.display()))
        })?;

        let vb = match &assets.weights {
            WeightsFile::Safetensors(path) => {
                debug!(path = %path.display(), "mapping safetensors weights");
                // SAFETY: the cache file is not modified while the mapping is alive.
                unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device) }
            }
            WeightsFile::Pickle(path) => {
                debug!(path = %path.display(), "loading pytorch weights");
                VarBuilder::from_pth(path, DType::F32, &device)
            }
        }
        .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;

        let is_roberta = config.get("model_type").and_then(Value::as_str) == Some("roberta");
        let model = if is_roberta {
            Architecture::Roberta(load_roberta(config, vb)?)
        } else {
            Architecture::Bert(load_bert(config, vb)?)
        };

        Ok(Self { model, device })
    }

    fn row_tensor(&self, values: &[u32]) -> Result<Tensor, EmbedError> {
        Tensor::new(values, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| EmbedError::Inference(e.to_string()))
    }
}

fn load_bert(config: Value, vb: VarBuilder) -> Result<BertModel, EmbedError> {
    let config: BertConfig =
        serde_json::from_value(config).map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
    debug!("building bert encoder");
    BertModel::load(vb, &config).map_err(|e| EmbedError::ModelLoad(e.to_string()))
}

fn load_roberta(mut config: Value, vb: VarBuilder) -> Result<XLMRobertaModel, EmbedError> {
    // Older RoBERTa configs (CodeBERT among them) predate this key.
    if let Some(fields) = config.as_object_mut() {
        fields
            .entry("position_embedding_type")
            .or_insert_with(|| Value::from("absolute"));
    }
    let config: RobertaConfig =
        serde_json::from_value(config).map_err(|e| EmbedError::ModelLoad(e.to_string()))?;

    // Bare `RobertaModel` checkpoints have no prefix, head checkpoints nest under `roberta.`
    let vb = if vb.contains_tensor("embeddings.word_embeddings.weight") {
        vb
    } else {
        vb.pp("roberta")
    };
    debug!(pad_token_id = config.pad_token_id, "building roberta encoder");
    XLMRobertaModel::new(&config, vb).map_err(|e| EmbedError::ModelLoad(e.to_string()))
}

impl Encoder for BertEncoder {
    fn forward(&self, input: &TokenizedInput) -> Result<EncoderOutput, EmbedError> {
        if input.is_empty() {
            return Err(EmbedError::Inference("tokenizer produced no tokens".into()));
        }

        let input_ids = self.row_tensor(&input.ids)?;
        let token_type_ids = self.row_tensor(&input.type_ids)?;
        let attention_mask = self.row_tensor(&input.attention_mask)?;

        let last_hidden_state = match &self.model {
            Architecture::Bert(model) => {
                model.forward(&input_ids, &token_type_ids, Some(&attention_mask))
            }
            Architecture::Roberta(model) => model.forward(
                &input_ids,
                &attention_mask,
                &token_type_ids,
                None,
                None,
                None,
            ),
        }
        .map_err(|e| EmbedError::Inference(e.to_string()))?;

        Ok(EncoderOutput { last_hidden_state })
    }
}
