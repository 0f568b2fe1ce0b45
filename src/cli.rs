use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mcp-ripgrep - ripgrep search exposed as MCP tools over stdio
#[derive(Parser, Debug)]
#[command(name = "mcp-ripgrep", version, about)]
pub struct Cli {
    /// Read configuration from this TOML file (layered over ~/.mcp-ripgrep/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// ripgrep binary to run (name on PATH or a path)
    #[arg(long, global = true, value_name = "PATH")]
    pub rg_path: Option<String>,

    /// Kill a search after this many seconds (0 waits indefinitely)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Log filter for stderr output, e.g. `debug` (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve MCP over stdin/stdout (the default)
    Serve,

    /// Print the tool definitions as JSON
    Tools,

    /// Run a single tool and print its output
    Call(CallArgs),
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct CallArgs {
    /// Tool name, e.g. `search` or `list-files`
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
