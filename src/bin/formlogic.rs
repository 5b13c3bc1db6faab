//! CLI wrapper for the formlogic sandbox.
//!
//! Usage:
//!   formlogic <file.js> --timeout-ms 100             # Evaluate a file
//!   formlogic -e "return a + b;" --bindings '{"a":2,"b":3}' --timeout-ms 100
//!   formlogic -e "code" --config sandbox.toml        # Options from a file
//!
//! Prints the result as JSON. Exit code 0 on success, 1 when the evaluation
//! fails, 2 on configuration errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use formlogic::boot::{boot, BootConfig};
use formlogic::hooks::HookConfig;
use formlogic::sandbox::{EvaluationRequest, EvaluationResult, SandboxConfig};
use formlogic::value::Value;

#[derive(Parser, Debug)]
#[command(name = "formlogic", version, about = "Evaluate form logic in the sandbox")]
struct Cli {
    /// Script file to evaluate
    #[arg(required_unless_present = "eval", conflicts_with = "eval")]
    file: Option<PathBuf>,

    /// Evaluate CODE instead of a file
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,

    /// JSON object whose keys become the script's variables
    #[arg(long, value_name = "JSON")]
    bindings: Option<String>,

    /// Time budget; overrides the configuration file
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Sandbox options (.json or .toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let request = match build_request(&cli) {
        Ok(request) => request,
        Err(message) => {
            eprintln!("formlogic: {}", message);
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let runtime = match load_config(&cli).and_then(|config| {
        boot(BootConfig::new(config), HookConfig::new()).map_err(|e| e.to_string())
    }) {
        Ok(runtime) => runtime,
        Err(message) => {
            eprintln!("formlogic: {}", message);
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    match runtime.evaluate(request) {
        Ok(EvaluationResult::Success(value)) => {
            println!("{}", value.to_json());
            ExitCode::SUCCESS
        }
        Ok(EvaluationResult::Failure(failure)) => {
            eprintln!("{}", failure);
            ExitCode::from(EXIT_FAILURE)
        }
        Err(e) => {
            eprintln!("formlogic: {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn load_config(cli: &Cli) -> Result<SandboxConfig, String> {
    let mut config = match &cli.config {
        Some(path) => SandboxConfig::load(path).map_err(|e| e.to_string())?,
        None => SandboxConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(config)
}

fn build_request(cli: &Cli) -> Result<EvaluationRequest, String> {
    let script = match (&cli.eval, &cli.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?,
        (None, None) => return Err("nothing to evaluate".to_string()),
    };
    let bindings = match &cli.bindings {
        None => BTreeMap::new(),
        Some(text) => match Value::from_json(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("--bindings must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid --bindings: {}", e)),
        },
    };
    Ok(EvaluationRequest::new(script).with_bindings(bindings))
}
