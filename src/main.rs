//! Command-line entry point.
//!
//! Reads the expression and output name from the arguments, loads
//! `ARITHC_*` configuration from the environment and runs the pipeline.

use std::{env, path::PathBuf, process};

use anyhow::anyhow;
use arithc::{config::LogFormat, CompileError, CompilerConfig};
use tracing::{error, warn, Level};

const USAGE: &str = "Usage: arithc [-v] [--emit-llvm] <expression> [output]";
const DEFAULT_OUTPUT: &str = "output";

struct Args {
    verbose: bool,
    emit_llvm: bool,
    source: String,
    output: PathBuf,
}

fn parse_args() -> Option<Args> {
    let mut verbose = false;
    let mut emit_llvm = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "--emit-llvm" => emit_llvm = true,
            "-h" | "--help" => return None,
            _ => positional.push(arg),
        }
    }
    if positional.is_empty() || positional.len() > 2 {
        return None;
    }
    let mut positional = positional.into_iter();
    let source = positional.next()?;
    let output = PathBuf::from(positional.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));
    Some(Args { verbose, emit_llvm, source, output })
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(level);
    match format {
        LogFormat::Json => builder.json().with_current_span(false).init(),
        LogFormat::Text => builder.init(),
    }
}

fn report(err: CompileError, source: &str) -> anyhow::Error {
    let phase = err.phase();
    error!(%phase, error = ?err, "compilation failed");
    anyhow!("[{phase}] {}", err.render(source))
}

fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        process::exit(2);
    };

    let log_format = match LogFormat::from_env() {
        Ok(format) => format,
        Err(raw) => {
            init_tracing(LogFormat::default(), args.verbose);
            warn!(variable = "ARITHC_LOG_FORMAT", value = %raw, "expected json or text, using default");
            return run(args);
        }
    };
    init_tracing(log_format, args.verbose);
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = CompilerConfig::from_env();

    if args.emit_llvm {
        let ir = arithc::emit_ir(&args.source).map_err(|e| report(e, &args.source))?;
        print!("{ir}");
        return Ok(());
    }

    let artifacts =
        arithc::compile(&args.source, &args.output, &config).map_err(|e| report(e, &args.source))?;
    println!("Built {}", artifacts.executable.display());
    Ok(())
}
