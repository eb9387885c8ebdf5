use std::{fs, path::Path, str::FromStr};

use serde_json::{json, Map, Value};
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::{Tokenizer, TruncationParams};

use crate::assets::TokenizerFiles;
use crate::types::TokenizedInput;
use crate::EmbedError;

const BOS_TOKEN: &str = "<s>";
const PAD_TOKEN: &str = "<pad>";
const EOS_TOKEN: &str = "</s>";
const UNK_TOKEN: &str = "<unk>";
const MASK_TOKEN: &str = "<mask>";

pub(crate) fn load_tokenizer(files: &TokenizerFiles) -> Result<Tokenizer, EmbedError> {
    match files {
        TokenizerFiles::Json(path) => Tokenizer::from_file(path)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", path.display()))),
        TokenizerFiles::VocabMerges { vocab, merges } => {
            let vocab = read_vocab(vocab)?;
            let merges = read_merges(merges)?;
            byte_level_bpe(vocab, merges)
        }
    }
}

/// Byte-level tokenizer with one token per byte and no merges.
/// Backs the stub encoder so it sees real, truncatable token sequences without any download.
pub(crate) fn stub_tokenizer() -> Result<Tokenizer, EmbedError> {
    let mut vocab = Map::new();
    for (id, token) in [BOS_TOKEN, PAD_TOKEN, EOS_TOKEN, UNK_TOKEN].iter().enumerate() {
        vocab.insert((*token).to_string(), json!(id));
    }
    let mut alphabet: Vec<char> = ByteLevel::alphabet().into_iter().collect();
    alphabet.sort_unstable();
    for ch in alphabet {
        let id = vocab.len();
        vocab.insert(ch.to_string(), json!(id));
    }
    byte_level_bpe(vocab, Vec::new())
}

/// Truncate on the right to `max_length` tokens, special tokens included; padding off.
pub(crate) fn apply_truncation(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), EmbedError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| EmbedError::InvalidConfig(e.to_string()))?;
    tokenizer.with_padding(None);
    Ok(())
}

pub(crate) fn encode(tokenizer: &Tokenizer, text: &str) -> Result<TokenizedInput, EmbedError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| EmbedError::Encoding(e.to_string()))?;

    Ok(TokenizedInput {
        ids: encoding.get_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
        type_ids: encoding.get_type_ids().to_vec(),
        truncated: !encoding.get_overflowing().is_empty(),
    })
}

fn read_vocab(path: &Path) -> Result<Map<String, Value>, EmbedError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", path.display())))
}

fn read_merges(path: &Path) -> Result<Vec<String>, EmbedError> {
    let raw = fs::read_to_string(path)?;
    Ok(parse_merges(&raw))
}

/// `merges.txt` lines are `left right`; the optional `#version` header and blanks are skipped.
fn parse_merges(raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|line| !line.starts_with("#version") && !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// RoBERTa-style pipeline: byte-level pre-tokenization, BPE model, `<s> ... </s>` framing.
fn byte_level_bpe(vocab: Map<String, Value>, merges: Vec<String>) -> Result<Tokenizer, EmbedError> {
    let token_id = |token: &str| -> Result<u64, EmbedError> {
        vocab.get(token).and_then(Value::as_u64).ok_or_else(|| {
            EmbedError::ModelLoad(format!("vocabulary has no {token} token"))
        })
    };
    let bos = token_id(BOS_TOKEN)?;
    let eos = token_id(EOS_TOKEN)?;

    let added_tokens: Vec<Value> = [BOS_TOKEN, PAD_TOKEN, EOS_TOKEN, UNK_TOKEN, MASK_TOKEN]
        .iter()
        .filter_map(|token| {
            let lstrip = *token == MASK_TOKEN;
            vocab.get(*token).and_then(Value::as_u64).map(|id| {
                json!({
                    "id": id,
                    "content": token,
                    "single_word": false,
                    "lstrip": lstrip,
                    "rstrip": false,
                    "normalized": false,
                    "special": true,
                })
            })
        })
        .collect();

    let byte_level = json!({
        "type": "ByteLevel",
        "add_prefix_space": false,
        "trim_offsets": true,
        "use_regex": true,
    });

    let definition = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": byte_level,
        "post_processor": {
            "type": "RobertaProcessing",
            "sep": [EOS_TOKEN, eos],
            "cls": [BOS_TOKEN, bos],
            "trim_offsets": true,
            "add_prefix_space": false,
        },
        "decoder": byte_level,
        "model": {
            "type": "BPE",
            "dropout": null,
            "unk_token": UNK_TOKEN,
            "continuing_subword_prefix": null,
            "end_of_word_suffix": null,
            "fuse_unk": false,
            "byte_fallback": false,
            "vocab": vocab,
            "merges": merges,
        },
    });

    Tokenizer::from_str(&definition.to_string()).map_err(|e| EmbedError::ModelLoad(e.to_string()))
}
