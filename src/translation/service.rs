use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::config::GenerationConfig;
use super::model::Translator;
use crate::error::{Result, TranslatorError};

/// 全局翻譯模型實例
static TRANSLATOR: Mutex<Option<Arc<Translator>>> = Mutex::const_new(None);

/// Load the process-wide translator. Once loaded, later calls are no-ops,
/// even with a different path.
pub async fn init_translator(model_path: impl Into<PathBuf>) -> Result<()> {
    let mut guard = TRANSLATOR.lock().await;
    if guard.is_some() {
        tracing::debug!("translator already initialized");
        return Ok(());
    }

    let model_path = model_path.into();
    let translator = tokio::task::spawn_blocking(move || Translator::load(model_path)).await??;
    *guard = Some(Arc::new(translator));
    Ok(())
}

pub async fn is_initialized() -> bool {
    TRANSLATOR.lock().await.is_some()
}

/// Translate with the default generation config.
pub async fn translate(text: &str) -> Result<String> {
    translate_with(text, GenerationConfig::default()).await
}

pub async fn translate_with(text: &str, config: GenerationConfig) -> Result<String> {
    let translator = TRANSLATOR
        .lock()
        .await
        .clone()
        .ok_or(TranslatorError::NotInitialized)?;

    let text = text.to_string();
    tokio::task::spawn_blocking(move || translator.translate(&text, &config)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing in this test binary ever loads a model, so the singleton
    // stays empty.
    #[tokio::test]
    async fn test_translate_before_init() {
        let err = translate("Hello world").await.unwrap_err();
        assert!(matches!(err, TranslatorError::NotInitialized));
        assert_eq!(
            err.to_string(),
            "Translator not initialized. Call init_translator first."
        );
    }

    #[tokio::test]
    async fn test_failed_init_leaves_singleton_empty() {
        let result = init_translator("/nonexistent/model").await;
        assert!(matches!(result, Err(TranslatorError::MissingPath(_))));
        assert!(!is_initialized().await);
    }
}
