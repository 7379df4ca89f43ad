//! Verify command - list the catalog and run a live prompt per model.

use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};
use vtx_core::{ChatRequest, Environment};

use super::Session;
use crate::output::{JsonFormatter, TextFormatter, VerifyOutput};
use crate::{Cli, ExitCode, OutputFormat};

const VERIFY_PROMPT: &str = "Reply with the single word: ok";
const VERIFY_MAX_TOKENS: u32 = 32;

/// Arguments for the verify command.
#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Only verify this alias.
    #[arg(long, short)]
    pub model: Option<String>,
}

/// Runs the verify command.
pub async fn run(args: &VerifyArgs, cli: &Cli, env: Environment) -> Result<ExitCode> {
    let session = Session::open(cli, env)?;
    let aliases: Vec<String> = match &args.model {
        Some(alias) => vec![alias.clone()],
        None => session.catalog.aliases().map(str::to_string).collect(),
    };
    info!(models = aliases.len(), "Verifying models");

    let formatter = TextFormatter::new(!cli.no_color);
    if cli.format == OutputFormat::Text {
        println!("{}", formatter.format_verify_header());
        println!("{}", "─".repeat(78));
    }

    let mut results = Vec::with_capacity(aliases.len());
    for alias in &aliases {
        let result = verify_one(&session, alias).await;
        if cli.format == OutputFormat::Text {
            println!("{}", formatter.format_verify_line(&result));
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.ok).count();
    match cli.format {
        OutputFormat::Text => {
            println!();
            println!("Passed: {}/{}", results.len() - failed, results.len());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&results)?);
        }
    }

    if failed == 0 {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::Error)
    }
}

async fn verify_one(session: &Session, alias: &str) -> VerifyOutput {
    let start = Instant::now();
    let (config, adapter) = match session.adapter(alias) {
        Ok(pair) => pair,
        Err(e) => return VerifyOutput::failed(alias, None, &e, start.elapsed()),
    };

    let auth = adapter.authenticate().await;
    if let Some(err) = auth.error {
        warn!(alias, code = %err.code, "Authentication failed");
        return VerifyOutput::from_auth_error(&config, err, start.elapsed());
    }

    let request = ChatRequest::prompt(VERIFY_PROMPT, VERIFY_MAX_TOKENS);
    match adapter.send_request(&request).await {
        Ok(response) => VerifyOutput::passed(&config, &response, start.elapsed()),
        Err(err) => {
            warn!(alias, code = %err.code, "Prompt failed");
            VerifyOutput::from_auth_error(&config, err, start.elapsed())
        }
    }
}
