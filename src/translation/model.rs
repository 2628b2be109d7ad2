/**
 * 翻譯模型
 * Encoder-Decoder ONNX 模型 + tokenizer
 *
 * encoder_model.onnx: input_ids, attention_mask -> last_hidden_state
 * decoder_model.onnx: input_ids, encoder_hidden_states, encoder_attention_mask -> logits
 */
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::{Session, SessionOutputs};
use ort::value::{DynValue, Tensor};

use super::config::{GenerationConfig, ModelConfig, ModelFiles};
use super::decode::{greedy_decode, last_position_logits, StepDecoder};
use crate::error::{Result, TranslatorError};
use crate::tokenizer::PretrainedTokenizer;

/// Session 需要 &mut self 來執行推理，所以用 Mutex 包裝
pub struct Translator {
    encoder_session: Mutex<Session>,
    decoder_session: Mutex<Session>,
    tokenizer: PretrainedTokenizer,
    model_dir: PathBuf,
    decoder_start_token_id: i64,
    eos_token_id: i64,
}

impl Translator {
    /// Load tokenizer, encoder and decoder from `model_path`.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_dir = model_path.as_ref();
        if !model_dir.exists() {
            return Err(TranslatorError::MissingPath(model_dir.to_path_buf()));
        }

        let config = ModelConfig::load(model_dir)?;
        let tokenizer = PretrainedTokenizer::from_pretrained(model_dir)?;
        let files = ModelFiles::locate(model_dir)?;

        // The decoder is seeded with the pad token; Marian-style configs set
        // decoder_start_token_id to the same id.
        let decoder_start_token_id = tokenizer
            .pad_token_id()
            .map(i64::from)
            .or(config.decoder_start_token_id)
            .ok_or_else(|| TranslatorError::Tokenizer("no pad / decoder start token".into()))?;
        let eos_token_id = tokenizer
            .eos_token_id()
            .map(i64::from)
            .ok_or_else(|| TranslatorError::Tokenizer("no eos token".into()))?;

        let encoder_session = crate::utils::onnx::load_session(&files.encoder)?;
        let decoder_session = crate::utils::onnx::load_session(&files.decoder)?;

        tracing::info!(
            model_dir = ?model_dir,
            model_type = config.model_type.as_deref().unwrap_or("unknown"),
            decoder_start_token_id,
            eos_token_id,
            "translator loaded"
        );

        Ok(Self {
            encoder_session: Mutex::new(encoder_session),
            decoder_session: Mutex::new(decoder_session),
            tokenizer,
            model_dir: model_dir.to_path_buf(),
            decoder_start_token_id,
            eos_token_id,
        })
    }

    /// Translate `text`, generating at most `config.max_length` tokens.
    pub fn translate(&self, text: &str, config: &GenerationConfig) -> Result<String> {
        translate_ids(&self.tokenizer, text, |input_ids, attention_mask| {
            let encoder_hidden_states = self.encode(input_ids, attention_mask)?;

            let mut decoder_guard = self
                .decoder_session
                .lock()
                .map_err(|e| TranslatorError::runtime(format!("decoder lock poisoned: {e}")))?;
            let mut step = OnnxStep {
                session: &mut decoder_guard,
                encoder_hidden_states: &encoder_hidden_states,
                encoder_attention_mask: attention_mask,
            };

            greedy_decode(
                &mut step,
                self.decoder_start_token_id,
                self.eos_token_id,
                config.max_length,
            )
        })
    }

    fn encode(&self, input_ids: &[i64], attention_mask: &[i64]) -> Result<HiddenStates> {
        let seq_len = input_ids.len();
        let input_ids_tensor =
            Tensor::<i64>::from_array(([1, seq_len], input_ids.to_vec().into_boxed_slice()))
                .map_err(TranslatorError::runtime)?;
        let attention_mask_tensor =
            Tensor::<i64>::from_array(([1, seq_len], attention_mask.to_vec().into_boxed_slice()))
                .map_err(TranslatorError::runtime)?;

        let mut encoder_guard = self
            .encoder_session
            .lock()
            .map_err(|e| TranslatorError::runtime(format!("encoder lock poisoned: {e}")))?;
        let mut outputs = encoder_guard
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
            .map_err(TranslatorError::runtime)?;

        let value = take_output(&mut outputs, "last_hidden_state")?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(TranslatorError::runtime)?;
        HiddenStates::from_tensor(&shape[..], data)
    }

    pub fn tokenizer(&self) -> &PretrainedTokenizer {
        &self.tokenizer
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

/// Tokenize, generate, detokenize. `generate` gets the encoder inputs and
/// returns the generated ids; it is never called when the tokenizer yields
/// no ids.
pub(crate) fn translate_ids<F>(
    tokenizer: &PretrainedTokenizer,
    text: &str,
    generate: F,
) -> Result<String>
where
    F: FnOnce(&[i64], &[i64]) -> Result<Vec<i64>>,
{
    let encoded = tokenizer.encode(text)?;
    let input_ids: Vec<i64> = encoded.input_ids.iter().map(|&id| i64::from(id)).collect();
    let attention_mask: Vec<i64> = encoded
        .attention_mask
        .iter()
        .map(|&m| i64::from(m))
        .collect();
    tracing::debug!(tokens = input_ids.len(), "encoded input");
    if input_ids.is_empty() {
        return Ok(String::new());
    }

    let generated = generate(&input_ids, &attention_mask)?;
    tracing::debug!(generated = generated.len(), "decoding finished");

    tokenizer.decode(&to_output_ids(generated)?)
}

fn to_output_ids(generated: Vec<i64>) -> Result<Vec<u32>> {
    generated
        .into_iter()
        .map(|id| {
            u32::try_from(id)
                .map_err(|_| TranslatorError::BadTensor(format!("token id {id} out of range")))
        })
        .collect()
}

/// Encoder output copied out of the session so it can be re-fed every step.
#[derive(Debug)]
struct HiddenStates {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl HiddenStates {
    fn from_tensor(shape: &[i64], data: &[f32]) -> Result<Self> {
        let bad_shape = || {
            TranslatorError::BadTensor(format!(
                "encoder output shape {shape:?}, expected [batch, seq, hidden]"
            ))
        };
        let [batch, seq, hidden] = shape else {
            return Err(bad_shape());
        };
        let dims = [*batch, *seq, *hidden].map(usize::try_from);
        let [Ok(batch), Ok(seq), Ok(hidden)] = dims else {
            return Err(bad_shape());
        };
        if batch * seq * hidden != data.len() {
            return Err(TranslatorError::BadTensor(format!(
                "encoder output has {} values for shape {shape:?}",
                data.len()
            )));
        }
        Ok(Self {
            shape: [batch, seq, hidden],
            data: data.to_vec(),
        })
    }
}

struct OnnxStep<'a> {
    session: &'a mut Session,
    encoder_hidden_states: &'a HiddenStates,
    encoder_attention_mask: &'a [i64],
}

impl StepDecoder for OnnxStep<'_> {
    fn next_token_logits(&mut self, decoder_input_ids: &[i64]) -> Result<Vec<f32>> {
        let input_ids = Tensor::<i64>::from_array((
            [1, decoder_input_ids.len()],
            decoder_input_ids.to_vec().into_boxed_slice(),
        ))
        .map_err(TranslatorError::runtime)?;
        let encoder_hidden_states = Tensor::<f32>::from_array((
            self.encoder_hidden_states.shape,
            self.encoder_hidden_states.data.clone().into_boxed_slice(),
        ))
        .map_err(TranslatorError::runtime)?;
        let encoder_attention_mask = Tensor::<i64>::from_array((
            [1, self.encoder_attention_mask.len()],
            self.encoder_attention_mask.to_vec().into_boxed_slice(),
        ))
        .map_err(TranslatorError::runtime)?;

        let mut outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "encoder_hidden_states" => encoder_hidden_states,
                "encoder_attention_mask" => encoder_attention_mask
            ])
            .map_err(TranslatorError::runtime)?;

        let logits = take_output(&mut outputs, "logits")?;
        let (shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(TranslatorError::runtime)?;
        last_position_logits(&shape[..], data)
    }
}

/// Named output, or the first output when the export uses other names.
fn take_output(outputs: &mut SessionOutputs, name: &'static str) -> Result<DynValue> {
    let key =
        pick_output_name(outputs.keys(), name).ok_or(TranslatorError::MissingOutput(name))?;
    if key != name {
        tracing::warn!(expected = name, found = %key, "output name mismatch, using first output");
    }
    outputs
        .remove(key.as_str())
        .ok_or(TranslatorError::MissingOutput(name))
}

fn pick_output_name<'a>(names: impl IntoIterator<Item = &'a str>, wanted: &str) -> Option<String> {
    let mut first = None;
    for name in names {
        if name == wanted {
            return Some(name.to_string());
        }
        first.get_or_insert(name);
    }
    first.map(str::to_string)
}
