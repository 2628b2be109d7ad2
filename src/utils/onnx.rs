use std::path::Path;
use std::sync::Once;

use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::error::{Result, TranslatorError};

static INIT: Once = Once::new();

/// Initialize the ONNX Runtime environment once per process.
///
/// With `load-dynamic` the shared library is resolved from `ORT_DYLIB_PATH`
/// or the platform search path on first use.
pub fn init_onnx() {
    INIT.call_once(|| {
        // true = first-time initialization, false = already initialized
        let is_first = ort::init().commit();
        if is_first {
            tracing::debug!("ONNX Runtime initialized");
        } else {
            tracing::debug!("ONNX Runtime already initialized");
        }
    });
}

/// Load a session on the default (CPU) execution provider.
pub fn load_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        return Err(TranslatorError::MissingPath(model_path.to_path_buf()));
    }
    init_onnx();

    tracing::info!(path = ?model_path, "loading onnx session");
    let session = Session::builder()
        .map_err(TranslatorError::runtime)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(TranslatorError::runtime)?
        .commit_from_file(model_path)
        .map_err(TranslatorError::runtime)?;
    Ok(session)
}
