// 錯誤類型
pub mod error;
// 日誌初始化
pub mod logging;
// Tokenizer 加載
pub mod tokenizer;
// stdin/stdout tokenizer 服務
pub mod tokenizer_service;
// 翻譯模塊
pub mod translation;
// ONNX Runtime 工具
pub mod utils;

pub use error::{Result, TranslatorError};
pub use tokenizer::PretrainedTokenizer;
pub use translation::{GenerationConfig, Translator};
