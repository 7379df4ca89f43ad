//! Chat command - send one prompt to a model.

use std::io::Write;

use anyhow::{Result, bail};
use futures::StreamExt;
use tracing::{debug, info};
use vtx_core::{ChatRequest, ChatResponse, Environment};

use super::Session;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the chat command.
#[derive(clap::Args, Debug)]
pub struct ChatArgs {
    /// Model alias from the catalog.
    #[arg(long, short)]
    pub model: String,

    /// Stream the reply as it is generated.
    #[arg(long)]
    pub stream: bool,

    /// Completion budget (defaults to the model's max_tokens).
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// System prompt.
    #[arg(long)]
    pub system: Option<String>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Prompt text. Words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

impl ChatArgs {
    fn request(&self, default_max_tokens: u32) -> ChatRequest {
        let mut request = ChatRequest::prompt(
            self.prompt.join(" "),
            self.max_tokens.unwrap_or(default_max_tokens),
        );
        if let Some(system) = &self.system {
            request = request.with_system(system.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

/// Runs the chat command.
pub async fn run(args: &ChatArgs, cli: &Cli, env: Environment) -> Result<ExitCode> {
    let session = Session::open(cli, env)?;
    let (config, adapter) = session.adapter(&args.model)?;
    let request = args.request(config.max_tokens);
    info!(alias = %config.alias, stream = args.stream, "Sending prompt");

    if args.stream && !adapter.supports_streaming() {
        debug!(alias = %config.alias, "Adapter does not stream; reply arrives in one piece");
    }

    let response = if args.stream {
        stream_reply(adapter.as_ref(), &request, cli).await?
    } else {
        adapter.send_request(&request).await?
    };

    match cli.format {
        OutputFormat::Text => {
            if !args.stream {
                println!("{}", response.content);
            }
            if cli.verbose {
                let formatter = TextFormatter::new(!cli.no_color);
                eprintln!("{}", formatter.format_response_footer(&response));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&response)?);
        }
    }

    Ok(ExitCode::Success)
}

/// Streams a reply, echoing text chunks as they arrive in text mode.
async fn stream_reply(
    adapter: &dyn vtx_core::ModelAdapter,
    request: &ChatRequest,
    cli: &Cli,
) -> Result<ChatResponse> {
    let echo = cli.format == OutputFormat::Text;
    let mut stream = adapter.stream_request(request).await?;
    let mut response = ChatResponse::default();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if echo && !chunk.content.is_empty() {
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
        }
        response.content.push_str(&chunk.content);
        if chunk.stop_reason.is_some() {
            response.stop_reason = chunk.stop_reason;
        }
    }

    if echo {
        writeln!(stdout)?;
    }
    if response.content.is_empty() && response.stop_reason.is_none() {
        bail!("Stream ended without any content");
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_chat_args_build_request() {
        let cli = Cli::parse_from([
            "vtx", "chat", "-m", "flash", "--max-tokens", "64", "--system", "be brief", "hello",
            "there",
        ]);
        let crate::Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        let request = args.request(4096);
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "hello there");
    }

    #[test]
    fn test_chat_defaults_to_model_budget() {
        let cli = Cli::parse_from(["vtx", "chat", "-m", "flash", "--stream", "hi"]);
        let crate::Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert!(args.stream);
        assert_eq!(args.request(1024).max_tokens, 1024);
    }
}
