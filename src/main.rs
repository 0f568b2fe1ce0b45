use std::process::ExitCode;

use mcp_ripgrep::config::Config;
use mcp_ripgrep::errors::{AppError, EXIT_SUCCESS, EXIT_USAGE};
use mcp_ripgrep::{cli, logging, router};

fn main() -> ExitCode {
    let cli = cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return ExitCode::from(report(&AppError::Usage(format!("{e:#}")))),
    };
    config.apply_cli(&cli);

    if let Err(e) = logging::init(&config.log.level) {
        return ExitCode::from(report(&AppError::Usage(format!("{e:#}"))));
    }

    match router::dispatch(&cli, &config) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS as u8),
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::from(report(&e))
        }
    }
}

/// Print `error:` and an optional `hint:` line to stderr; return the exit code.
fn report(err: &AppError) -> u8 {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
    u8::try_from(err.exit_code()).unwrap_or(EXIT_USAGE as u8)
}
