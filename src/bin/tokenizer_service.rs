use std::io::{self, BufRead, Read, Write};
use std::process::ExitCode;

use clap::Parser;

use onnx_translator::logging::init_logging;
use onnx_translator::tokenizer_service::{Response, TokenizerService};

#[derive(Parser, Debug)]
#[command(name = "tokenizer-service")]
#[command(about = "JSON tokenizer service over stdin/stdout")]
struct Args {
    /// Handle one request per stdin line instead of a single request
    #[arg(long)]
    lines: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    init_logging();
    let args = Args::parse();
    let mut service = TokenizerService::new();
    let stdout = io::stdout();

    if args.lines {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut out = stdout.lock();
            writeln!(out, "{}", service.handle_json(line).to_json())?;
            out.flush()?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        println!("{}", Response::error("No input").to_json());
        return Ok(ExitCode::FAILURE);
    }

    println!("{}", service.handle_json(input).to_json());
    Ok(ExitCode::SUCCESS)
}
