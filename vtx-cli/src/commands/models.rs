//! Models command - list the catalog.

use anyhow::Result;
use tracing::info;
use vtx_core::Environment;
use vtx_providers::AdapterKind;

use super::Session;
use crate::output::{JsonFormatter, ModelOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the models command.
pub async fn run(cli: &Cli, env: Environment) -> Result<ExitCode> {
    let session = Session::open(cli, env)?;
    info!(models = session.catalog.len(), "Listing models");

    let mut rows = Vec::with_capacity(session.catalog.len());
    for alias in session.catalog.aliases() {
        let config = session.config(alias)?;
        let kind = AdapterKind::select(&config).ok();
        rows.push((config, kind));
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_models_header());
            println!("{}", "─".repeat(78));
            for (config, kind) in &rows {
                println!("{}", formatter.format_model_line(config, *kind));
            }

            println!();
            match session.catalog.source() {
                Some(path) => println!("Total: {} models ({})", rows.len(), path.display()),
                None => println!("Total: {} models", rows.len()),
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let outputs: Vec<ModelOutput> = rows
                .iter()
                .map(|(config, kind)| ModelOutput::new(config, *kind))
                .collect();
            println!("{}", formatter.format(&outputs)?);
        }
    }

    Ok(ExitCode::Success)
}
