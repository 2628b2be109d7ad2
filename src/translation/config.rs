use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Result, TranslatorError};

/// Subset of the HF `config.json` the translator cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub pad_token_id: Option<i64>,
    #[serde(default)]
    pub eos_token_id: Option<i64>,
    #[serde(default)]
    pub decoder_start_token_id: Option<i64>,
    #[serde(default)]
    pub vocab_size: Option<usize>,
    #[serde(default)]
    pub d_model: Option<usize>,
}

impl ModelConfig {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let path = model_dir.join("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        read_json(&path)
    }
}

/// 生成配置參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Upper bound on decoder steps, and so on generated tokens.
    pub max_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_length: 64 }
    }
}

/// Encoder / decoder graph locations inside a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
}

impl ModelFiles {
    /// Plain exports win; quantized exports are used when the plain file is absent.
    pub fn locate(model_dir: &Path) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(TranslatorError::MissingPath(model_dir.to_path_buf()));
        }
        Ok(Self {
            encoder: pick(model_dir, "encoder_model")?,
            decoder: pick(model_dir, "decoder_model")?,
        })
    }
}

fn pick(model_dir: &Path, stem: &str) -> Result<PathBuf> {
    let plain = model_dir.join(format!("{stem}.onnx"));
    if plain.exists() {
        return Ok(plain);
    }
    let quantized = model_dir.join(format!("{stem}_quantized.onnx"));
    if quantized.exists() {
        tracing::info!(path = ?quantized, "using quantized export");
        return Ok(quantized);
    }
    Err(TranslatorError::MissingPath(plain))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|source| TranslatorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| TranslatorError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_model_config_partial() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"model_type": "marian", "pad_token_id": 65000, "eos_token_id": 0, "architectures": ["MarianMTModel"]}"#,
        )
        .unwrap();

        let cfg = ModelConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.model_type.as_deref(), Some("marian"));
        assert_eq!(cfg.pad_token_id, Some(65000));
        assert_eq!(cfg.eos_token_id, Some(0));
        assert_eq!(cfg.decoder_start_token_id, None);
    }

    #[test]
    fn test_model_config_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig::load(dir.path()).unwrap();
        assert!(cfg.eos_token_id.is_none());
    }

    #[test]
    fn test_model_config_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let err = ModelConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, TranslatorError::Config { .. }));
    }

    #[test]
    fn test_locate_prefers_plain_export() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "encoder_model.onnx",
            "encoder_model_quantized.onnx",
            "decoder_model_quantized.onnx",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = ModelFiles::locate(dir.path()).unwrap();
        assert_eq!(files.encoder, dir.path().join("encoder_model.onnx"));
        assert_eq!(files.decoder, dir.path().join("decoder_model_quantized.onnx"));
    }

    #[test]
    fn test_locate_missing_decoder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("encoder_model.onnx"), b"").unwrap();
        match ModelFiles::locate(dir.path()) {
            Err(TranslatorError::MissingPath(p)) => {
                assert_eq!(p, dir.path().join("decoder_model.onnx"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_default_generation_config() {
        assert_eq!(GenerationConfig::default().max_length, 64);
    }
}
