use std::io::Write;

use crate::cli::{CallArgs, Cli, Command};
use crate::command::CommandBuilder;
use crate::config::Config;
use crate::errors::{AppError, ValidationError};
use crate::executor::ProcessExecutor;
use crate::mcp::{self, McpServer};
use crate::service::ServerContext;

/// Build the per-process context from resolved configuration.
pub fn build_context(config: &Config) -> ServerContext<ProcessExecutor> {
    ServerContext::new(
        CommandBuilder::new(&config.ripgrep.binary),
        ProcessExecutor::new(config.ripgrep.timeout()),
    )
}

pub fn dispatch(cli: &Cli, config: &Config) -> Result<(), AppError> {
    match cli.command() {
        Command::Serve => {
            tracing::info!(
                rg = %config.ripgrep.binary,
                timeout_secs = config.ripgrep.timeout_secs,
                "serving MCP on stdio"
            );
            let server = McpServer::new(build_context(config));
            mcp::serve_stdio(&server)?;
        }
        Command::Tools => {
            let json = serde_json::to_string_pretty(mcp::tool_definitions())
                .map_err(anyhow::Error::from)?;
            println!("{json}");
        }
        Command::Call(args) => call(args, config)?,
    }
    Ok(())
}

/// One-shot tool call. An error result goes to stderr and fails the process.
fn call(args: &CallArgs, config: &Config) -> Result<(), AppError> {
    let json: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| ValidationError::InvalidArguments(e.to_string()))?;

    let context = build_context(config);
    let response = context
        .call(&args.tool, &json)
        .ok_or_else(|| AppError::Usage(format!("unknown tool: {}", args.tool)))?;

    if response.is_error {
        let message = response.text.trim_start_matches("Error: ").to_string();
        return Err(AppError::Other(anyhow::anyhow!(message)));
    }

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", response.text)?;
    if !response.text.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
