/**
 * 翻譯模塊
 * 本地 ONNX Encoder-Decoder 模型，Greedy 解碼
 */
pub mod config;
pub mod decode;
pub mod model;
pub mod service;

pub use config::{GenerationConfig, ModelConfig, ModelFiles};
pub use model::Translator;
