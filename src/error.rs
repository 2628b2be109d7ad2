use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslatorError>;

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("Translator not initialized. Call init_translator first.")]
    NotInitialized,

    #[error("Tokenizer not initialized")]
    TokenizerNotInitialized,

    #[error("path does not exist: {0:?}")]
    MissingPath(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("onnx runtime error: {0}")]
    Runtime(String),

    #[error("model output `{0}` not found")]
    MissingOutput(&'static str),

    #[error("unexpected tensor: {0}")]
    BadTensor(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TranslatorError {
    /// ort and tokenizers errors carry builder state or boxed trait objects,
    /// so they are flattened to their message.
    pub(crate) fn runtime(err: impl std::fmt::Display) -> Self {
        TranslatorError::Runtime(err.to_string())
    }

    pub(crate) fn tokenizer(err: impl std::fmt::Display) -> Self {
        TranslatorError::Tokenizer(err.to_string())
    }
}
