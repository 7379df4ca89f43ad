// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! vtx CLI - talk to Vertex AI hosted models from the command line.
//!
//! # Examples
//!
//! ```bash
//! # List the models in the catalog
//! vtx models
//!
//! # One-shot prompt
//! vtx chat -m gemini-flash "Summarise RFC 9110 in one line"
//!
//! # Stream the reply
//! vtx chat -m sonnet --stream "Write a haiku about TLS"
//!
//! # Check credentials for a model
//! vtx check -m sonnet
//!
//! # Live-test every model in the catalog
//! vtx verify --format json
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vtx_core::{AuthError, Environment};

use commands::{chat, check, models, verify};

// ============================================================================
// CLI Definition
// ============================================================================

/// vtx CLI - Vertex AI model access.
#[derive(Parser)]
#[command(name = "vtx")]
#[command(about = "Chat with Vertex AI hosted models")]
#[command(long_about = r#"
vtx routes prompts to models hosted on Vertex AI.

Models are defined in a models.yaml catalog ($VTX_MODELS, or
<config dir>/vtx/models.yaml). Each entry picks an auth method:
  • bearer-token   Google credentials (service account, ADC or gcloud)
  • anthropic-sdk  Anthropic Vertex SDK via Python
  • vertex-sdk     Vertex AI SDK via Python

Environment:
  GOOGLE_CLOUD_PROJECT            Project id (unless set per model)
  GOOGLE_API_KEY                  API key for Gemini models
  GOOGLE_APPLICATION_CREDENTIALS  Service account or ADC file
  VTX_PYTHON_PATH                 Interpreter for SDK models
  VTX_DEBUG                       Redacted request/response logging
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Path to the models catalog.
    #[arg(long, global = true, value_name = "PATH")]
    pub models: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List the models in the catalog.
    #[command(visible_alias = "ls")]
    Models,

    /// Send a prompt to a model.
    #[command(visible_alias = "c")]
    Chat(chat::ChatArgs),

    /// Check authentication and dependencies for a model.
    Check(check::CheckArgs),

    /// Run a live prompt against one or every model.
    Verify(verify::VerifyArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Authentication or dependency check failed.
    AuthFailed = 2,
    /// Catalog or model configuration error.
    ConfigError = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vtx=debug,info")
    } else {
        EnvFilter::new("vtx=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = Environment::from_process();

    setup_logging(cli.verbose || env.debug);

    let result = match &cli.command {
        Commands::Models => models::run(&cli, env).await,
        Commands::Chat(args) => chat::run(args, &cli, env).await,
        Commands::Check(args) => check::run(args, &cli, env).await,
        Commands::Verify(args) => verify::run(args, &cli, env).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            let code = report_error(&e, &cli);
            std::process::exit(code as i32);
        }
    }
}

/// Prints an error to stderr and picks the exit code for it.
fn report_error(err: &anyhow::Error, cli: &Cli) -> ExitCode {
    let Some(auth) = err.downcast_ref::<AuthError>() else {
        eprintln!("Error: {err}");
        return ExitCode::Error;
    };

    let formatter = output::TextFormatter::new(!cli.no_color);
    eprintln!("{}", formatter.format_error(auth));
    if auth.is(vtx_core::AuthErrorCode::InvalidConfig) {
        ExitCode::ConfigError
    } else {
        ExitCode::Error
    }
}
