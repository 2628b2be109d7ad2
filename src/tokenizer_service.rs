/**
 * Tokenizer 服務
 * Host application sends `{"command": ..., "args": [...]}` on stdin and
 * reads one JSON object back on stdout.
 */
use serde::{Deserialize, Serialize};

use crate::tokenizer::PretrainedTokenizer;

/// Missing and `null` fields both read as empty.
#[derive(Debug, Default, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

impl Request {
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or_default()
    }

    fn arg(&self, idx: usize) -> Option<&str> {
        self.args.as_deref()?.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Error {
        error: String,
    },
    Initialized {
        status: &'static str,
        vocab_size: usize,
    },
    Tokenized {
        input_ids: Vec<u32>,
        attention_mask: Vec<u32>,
        tokens: Vec<String>,
    },
}

impl Response {
    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { error: msg.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn to_json(&self) -> String {
        // Every variant is plain strings and integers.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":{}}}"#, serde_json::Value::String(e.to_string()))
        })
    }
}

#[derive(Default)]
pub struct TokenizerService {
    tokenizer: Option<PretrainedTokenizer>,
}

impl TokenizerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.tokenizer.is_some()
    }

    pub fn init_tokenizer(&mut self, model_path: &str) -> Response {
        match PretrainedTokenizer::from_pretrained(model_path) {
            Ok(tokenizer) => {
                let vocab_size = tokenizer.vocab_size();
                self.tokenizer = Some(tokenizer);
                Response::Initialized {
                    status: "success",
                    vocab_size,
                }
            }
            Err(e) => {
                tracing::warn!(model_path, error = %e, "tokenizer init failed");
                Response::error(e.to_string())
            }
        }
    }

    pub fn tokenize(&self, text: &str) -> Response {
        let Some(tokenizer) = self.tokenizer.as_ref() else {
            return Response::error("Tokenizer not initialized");
        };

        let result = tokenizer.encode(text).and_then(|encoded| {
            Ok(Response::Tokenized {
                input_ids: encoded.input_ids,
                attention_mask: encoded.attention_mask,
                tokens: tokenizer.tokenize(text)?,
            })
        });
        result.unwrap_or_else(|e| Response::error(e.to_string()))
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        match request.command() {
            "init" => self.init_tokenizer(request.arg(0).unwrap_or_default()),
            "tokenize" => {
                // A one-shot process never sees a previous `init`, so the
                // model path may ride along as a second argument.
                if let Some(model_path) = request.arg(1) {
                    if !self.is_initialized() {
                        let init = self.init_tokenizer(model_path);
                        if init.is_error() {
                            return init;
                        }
                    }
                }
                self.tokenize(request.arg(0).unwrap_or_default())
            }
            other => Response::error(format!("Unknown command: {other}")),
        }
    }

    /// Parse one raw request and handle it.
    pub fn handle_json(&mut self, input: &str) -> Response {
        match serde_json::from_str::<Request>(input) {
            Ok(request) => self.handle(&request),
            Err(e) => Response::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        assert_eq!(Response::error("No input").to_json(), r#"{"error":"No input"}"#);
        assert_eq!(
            Response::Initialized { status: "success", vocab_size: 7 }.to_json(),
            r#"{"status":"success","vocab_size":7}"#
        );
        assert_eq!(
            Response::Tokenized {
                input_ids: vec![3, 1],
                attention_mask: vec![1, 1],
                tokens: vec!["hello".into()],
            }
            .to_json(),
            r#"{"input_ids":[3,1],"attention_mask":[1,1],"tokens":["hello"]}"#
        );
    }

    #[test]
    fn test_tokenize_before_init() {
        let mut service = TokenizerService::new();
        let response = service.handle_json(r#"{"command": "tokenize", "args": ["hello"]}"#);
        assert_eq!(response, Response::error("Tokenizer not initialized"));
    }

    #[test]
    fn test_unknown_command() {
        let mut service = TokenizerService::new();
        assert_eq!(
            service.handle_json(r#"{"command": "detokenize"}"#),
            Response::error("Unknown command: detokenize")
        );
        assert_eq!(
            service.handle_json(r#"{"args": []}"#),
            Response::error("Unknown command: ")
        );
    }

    #[test]
    fn test_null_fields() {
        let mut service = TokenizerService::new();
        assert_eq!(
            service.handle_json(r#"{"command": null, "args": null}"#),
            Response::error("Unknown command: ")
        );
        assert_eq!(
            service.handle_json(r#"{"command": "tokenize", "args": null}"#),
            Response::error("Tokenizer not initialized")
        );
    }

    #[test]
    fn test_malformed_request() {
        let mut service = TokenizerService::new();
        assert!(service.handle_json("{not json").is_error());
        assert!(service.handle_json(r#"["init"]"#).is_error());
    }

    #[test]
    fn test_init_missing_model() {
        let mut service = TokenizerService::new();
        let response = service.handle_json(r#"{"command": "init", "args": ["/nonexistent/model"]}"#);
        assert!(response.is_error());
        assert!(!service.is_initialized());
    }

    #[test]
    fn test_init_without_args() {
        let mut service = TokenizerService::new();
        assert!(service.handle_json(r#"{"command": "init"}"#).is_error());
    }
}
