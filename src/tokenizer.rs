/**
 * Pretrained tokenizer loading
 *
 * Loads `tokenizer.json` from a model directory and resolves the pad / eos
 * special tokens the decoder loop needs from `tokenizer_config.json`,
 * falling back to the model's `config.json`.
 */
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use crate::error::{Result, TranslatorError};
use crate::translation::config::{read_json, ModelConfig};

/// HF writes a huge sentinel into `model_max_length` when the model has no limit.
const MAX_SANE_MODEL_LENGTH: f64 = 1_000_000.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SpecialTokenValue {
    Text(String),
    Object { content: String },
}

impl SpecialTokenValue {
    fn content(&self) -> &str {
        match self {
            SpecialTokenValue::Text(s) => s,
            SpecialTokenValue::Object { content } => content,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenizerConfig {
    #[serde(default)]
    model_max_length: Option<f64>,
    #[serde(default)]
    pad_token: Option<SpecialTokenValue>,
    #[serde(default)]
    eos_token: Option<SpecialTokenValue>,
}

/// Output of encoding one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

pub struct PretrainedTokenizer {
    tokenizer: Tokenizer,
    /// Same tokenizer with truncation off, for `tokenize`.
    untruncated: Tokenizer,
    path: PathBuf,
    pad_token_id: Option<u32>,
    eos_token_id: Option<u32>,
    model_max_length: Option<usize>,
}

impl PretrainedTokenizer {
    /// `path` is either a model directory containing `tokenizer.json`
    /// or the `tokenizer.json` file itself.
    pub fn from_pretrained(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TranslatorError::MissingPath(path.to_path_buf()));
        }

        let (dir, tokenizer_path) = if path.is_dir() {
            (path.to_path_buf(), path.join("tokenizer.json"))
        } else {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (dir, path.to_path_buf())
        };
        if !tokenizer_path.exists() {
            return Err(TranslatorError::MissingPath(tokenizer_path));
        }

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(TranslatorError::tokenizer)?;

        let tokenizer_config: TokenizerConfig =
            read_optional_json(&dir.join("tokenizer_config.json"))?;
        let model_config: ModelConfig = read_optional_json(&dir.join("config.json"))?;

        // A single sequence is never padded, and truncation only comes from
        // `model_max_length`, whatever tokenizer.json declares.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(TranslatorError::tokenizer)?;
        let untruncated = tokenizer.clone();

        let model_max_length = tokenizer_config
            .model_max_length
            .filter(|len| *len > 0.0 && *len <= MAX_SANE_MODEL_LENGTH)
            .map(|len| len as usize);
        if let Some(max_length) = model_max_length {
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length,
                    ..Default::default()
                }))
                .map_err(TranslatorError::tokenizer)?;
        }

        let pad_token_id = resolve_special(
            &tokenizer,
            tokenizer_config.pad_token.as_ref(),
            model_config.pad_token_id,
            "<pad>",
        );
        let eos_token_id = resolve_special(
            &tokenizer,
            tokenizer_config.eos_token.as_ref(),
            model_config.eos_token_id,
            "</s>",
        );

        tracing::info!(
            path = ?tokenizer_path,
            vocab_size = tokenizer.get_vocab_size(true),
            ?pad_token_id,
            ?eos_token_id,
            ?model_max_length,
            "tokenizer loaded"
        );

        Ok(Self {
            tokenizer,
            untruncated,
            path: tokenizer_path,
            pad_token_id,
            eos_token_id,
            model_max_length,
        })
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(TranslatorError::tokenizer)?;
        Ok(EncodedText {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        })
    }

    /// Subword strings without special tokens. Never truncated.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self
            .untruncated
            .encode(text, false)
            .map_err(TranslatorError::tokenizer)?;
        Ok(encoding.get_tokens().to_vec())
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(TranslatorError::tokenizer)
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn pad_token_id(&self) -> Option<u32> {
        self.pad_token_id
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    pub fn model_max_length(&self) -> Option<usize> {
        self.model_max_length
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn resolve_special(
    tokenizer: &Tokenizer,
    configured: Option<&SpecialTokenValue>,
    config_id: Option<i64>,
    conventional: &str,
) -> Option<u32> {
    configured
        .and_then(|token| tokenizer.token_to_id(token.content()))
        .or_else(|| config_id.and_then(|id| u32::try_from(id).ok()))
        .or_else(|| tokenizer.token_to_id(conventional))
}

fn read_optional_json<T: Default + serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if path.exists() {
        read_json(path)
    } else {
        Ok(T::default())
    }
}
