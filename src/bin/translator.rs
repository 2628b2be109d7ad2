use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use onnx_translator::logging::init_logging;
use onnx_translator::translation::service;
use onnx_translator::GenerationConfig;

/// Flags win over the environment. `COMMAND`, `MODEL_PATH` and `TEXT` are
/// read by hand so that an empty or unknown value reaches the exit-1 path
/// instead of failing argument parsing.
#[derive(Parser, Debug)]
#[command(name = "translator")]
#[command(about = "Greedy ONNX encoder-decoder translation")]
struct Args {
    /// init | translate | serve [env: COMMAND]
    #[arg(long)]
    command: Option<String>,

    /// Model directory with encoder_model.onnx, decoder_model.onnx and tokenizer.json [env: MODEL_PATH]
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Text to translate [env: TEXT]
    #[arg(long)]
    text: Option<String>,

    /// Maximum number of generated tokens
    #[arg(long, env = "MAX_LENGTH", default_value_t = GenerationConfig::default().max_length)]
    max_length: usize,
}

/// Unset and empty variables are the same thing to the host.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging();
    let args = Args::parse();
    let config = GenerationConfig {
        max_length: args.max_length,
    };
    let command = args.command.or_else(|| env_value("COMMAND"));
    let model_path = args
        .model_path
        .or_else(|| env_value("MODEL_PATH").map(PathBuf::from));
    let text = args.text.or_else(|| env_value("TEXT"));

    match (command.as_deref(), model_path) {
        (Some("init"), Some(model_path)) => {
            service::init_translator(&model_path)
                .await
                .with_context(|| format!("load model from {model_path:?}"))?;
            tracing::info!(?model_path, "translator ready");
        }
        (Some("translate"), model_path) => {
            let Some(text) = text.filter(|t| !t.is_empty()) else {
                return Ok(ExitCode::SUCCESS);
            };
            if let Some(model_path) = model_path {
                service::init_translator(&model_path)
                    .await
                    .with_context(|| format!("load model from {model_path:?}"))?;
            }
            let result = service::translate_with(&text, config).await?;
            println!("{result}");
        }
        (Some("serve"), Some(model_path)) => {
            service::init_translator(&model_path)
                .await
                .with_context(|| format!("load model from {model_path:?}"))?;
            serve(config).await?;
        }
        (command, _) => {
            tracing::error!(?command, "expected `init` or `serve` with a model path, or `translate`");
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// One output line per non-empty input line. A line that fails to
/// translate yields an empty output line (the error goes to the log on
/// stderr), so an empty line can mean failure as well as empty output.
async fn serve(config: GenerationConfig) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let translated = match service::translate_with(line, config).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, "translation failed");
                String::new()
            }
        };
        let mut out = io::stdout().lock();
        writeln!(out, "{translated}")?;
        out.flush()?;
    }
    Ok(())
}
