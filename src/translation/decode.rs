/**
 * Greedy autoregressive decoding
 *
 * The decoder is re-run over the whole prefix each step (no past key/values),
 * and the highest scoring token of the last position is appended until the
 * end-of-sequence token shows up or the step budget runs out.
 */
use crate::error::{Result, TranslatorError};

/// One decoder forward pass.
pub trait StepDecoder {
    /// Logits over the vocabulary for the last position of `decoder_input_ids`.
    fn next_token_logits(&mut self, decoder_input_ids: &[i64]) -> Result<Vec<f32>>;
}

impl<F> StepDecoder for F
where
    F: FnMut(&[i64]) -> Result<Vec<f32>>,
{
    fn next_token_logits(&mut self, decoder_input_ids: &[i64]) -> Result<Vec<f32>> {
        self(decoder_input_ids)
    }
}

/// Index of the largest value, first one on ties. A NaN wins outright,
/// the same way `numpy.argmax` treats it.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            return Some(idx);
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Run greedy decoding.
///
/// Returns the generated ids, without the start token and without EOS.
pub fn greedy_decode<D: StepDecoder + ?Sized>(
    decoder: &mut D,
    start_token_id: i64,
    eos_token_id: i64,
    max_length: usize,
) -> Result<Vec<i64>> {
    let mut decoder_input_ids = Vec::with_capacity(max_length + 1);
    decoder_input_ids.push(start_token_id);

    for step in 0..max_length {
        let logits = decoder.next_token_logits(&decoder_input_ids)?;
        let next_token = argmax(&logits)
            .ok_or_else(|| TranslatorError::BadTensor(format!("empty logits at step {step}")))?
            as i64;

        if next_token == eos_token_id {
            tracing::debug!(step, "eos reached");
            break;
        }
        decoder_input_ids.push(next_token);
    }

    decoder_input_ids.remove(0);
    Ok(decoder_input_ids)
}

/// Slice the last position out of a `[batch, seq, vocab]` logits tensor (batch 0).
pub fn last_position_logits(shape: &[i64], data: &[f32]) -> Result<Vec<f32>> {
    let [_, seq_len, vocab] = shape else {
        return Err(TranslatorError::BadTensor(format!(
            "logits rank {} (shape {shape:?}), expected 3",
            shape.len()
        )));
    };
    let (seq_len, vocab) = (*seq_len as usize, *vocab as usize);
    if seq_len == 0 || vocab == 0 {
        return Err(TranslatorError::BadTensor(format!("empty logits shape {shape:?}")));
    }

    let start = (seq_len - 1) * vocab;
    let end = seq_len * vocab;
    data.get(start..end).map(<[f32]>::to_vec).ok_or_else(|| {
        TranslatorError::BadTensor(format!(
            "logits data length {} too short for shape {shape:?}",
            data.len()
        ))
    })
}
