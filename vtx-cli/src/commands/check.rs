//! Check command - authenticate a model without sending a prompt.

use anyhow::Result;
use tracing::info;
use vtx_core::Environment;

use super::Session;
use crate::output::{CheckOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the check command.
#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Model alias to check.
    #[arg(long, short)]
    pub model: String,
}

/// Runs the check command.
pub async fn run(args: &CheckArgs, cli: &Cli, env: Environment) -> Result<ExitCode> {
    let session = Session::open(cli, env)?;
    let (config, adapter) = session.adapter(&args.model)?;
    info!(alias = %config.alias, method = %config.auth_method, "Checking model");

    let dependencies = adapter.validate_dependencies().await;
    let auth = adapter.authenticate().await;
    let output = CheckOutput::new(&config, dependencies, &auth);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_check(&output));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    if output.authenticated {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::AuthFailed)
    }
}
