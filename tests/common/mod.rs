#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Word-level tokenizer: lowercase, whitespace split, `</s>` appended.
pub const TOKENIZER_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [
    {"id": 0, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 1, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 2, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
  ],
  "normalizer": {"type": "Lowercase"},
  "pre_tokenizer": {"type": "Whitespace"},
  "post_processor": {
    "type": "TemplateProcessing",
    "single": [
      {"Sequence": {"id": "A", "type_id": 0}},
      {"SpecialToken": {"id": "</s>", "type_id": 0}}
    ],
    "pair": [
      {"Sequence": {"id": "A", "type_id": 0}},
      {"Sequence": {"id": "B", "type_id": 0}},
      {"SpecialToken": {"id": "</s>", "type_id": 0}}
    ],
    "special_tokens": {
      "</s>": {"id": "</s>", "ids": [1], "tokens": ["</s>"]}
    }
  },
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {
      "<pad>": 0, "</s>": 1, "<unk>": 2, "hello": 3, "world": 4,
      ",": 5, "how": 6, "are": 7, "you": 8, "?": 9
    },
    "unk_token": "<unk>"
  }
}"#;

pub const VOCAB_SIZE: usize = 10;

pub fn write_tokenizer(dir: &Path) {
    fs::write(dir.join("tokenizer.json"), TOKENIZER_JSON).unwrap();
}

/// Model directory with `tokenizer.json` and a `tokenizer_config.json`.
pub fn tokenizer_dir(model_max_length: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_tokenizer(dir.path());
    fs::write(
        dir.path().join("tokenizer_config.json"),
        format!(
            r#"{{"model_max_length": {model_max_length}, "pad_token": "<pad>", "eos_token": {{"content": "</s>", "special": true}}}}"#
        ),
    )
    .unwrap();
    dir
}

/// Fixed-length padding to 8 and truncation to 2, as some exported
/// `tokenizer.json` files carry.
pub fn write_tokenizer_with_padding_and_truncation(dir: &Path) {
    let json = TOKENIZER_JSON
        .replace(
            r#""truncation": null"#,
            r#""truncation": {"direction": "Right", "max_length": 2, "strategy": "LongestFirst", "stride": 0}"#,
        )
        .replace(
            r#""padding": null"#,
            r#""padding": {"strategy": {"Fixed": 8}, "direction": "Right", "pad_to_multiple_of": null, "pad_id": 0, "pad_type_id": 0, "pad_token": "<pad>"}"#,
        );
    fs::write(dir.join("tokenizer.json"), json).unwrap();
}
