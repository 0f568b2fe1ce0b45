//! Application error types and user-facing error formatting.
//!
//! Provides structured error types for each layer:
//! - [`ValidationError`] for tool arguments rejected before anything runs
//! - [`ExecutionError`] for ripgrep launch and exit-status failures
//! - [`AppError`] as the unified top-level error type
//!
//! Per-call errors never leave the `tools/call` boundary; they are rendered
//! into tool results there. [`AppError`] carries hints and exit codes so that
//! `main()` can report start-up failures without exposing debug formatting.

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `0` - success
/// * `1` - general runtime error
/// * `2` - usage / configuration error
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Layer-specific error types
// ---------------------------------------------------------------------------

/// Tool arguments that failed validation. Raised before a command is built,
/// so ripgrep is never started for these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("parameter must not be empty: {0}")]
    EmptyParameter(&'static str),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Failures running the external search tool.
///
/// Exit code 1 with a clean stderr is ripgrep's "nothing matched" and is not
/// represented here; see [`crate::executor::ExecutionOutcome::NoMatches`].
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The program could not be started (missing binary, permissions, ...).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully.
    #[error("{}", describe_failure(.code))]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The bounded wait elapsed; the child was killed.
    #[error("command timed out after {after:?}")]
    TimedOut {
        after: Duration,
        stdout: String,
        stderr: String,
    },

    /// Reading the child's output pipes failed.
    #[error("failed to read command output: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_failure(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("command failed with exit code {code}"),
        None => "command terminated by signal".to_string(),
    }
}

impl ExecutionError {
    /// Exit code of the child, when it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::Failed { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured stderr, if the child got far enough to produce any.
    pub fn stderr(&self) -> &str {
        match self {
            ExecutionError::Failed { stderr, .. } | ExecutionError::TimedOut { stderr, .. } => {
                stderr
            }
            _ => "",
        }
    }

    /// Captured stdout, if the child got far enough to produce any.
    pub fn stdout(&self) -> &str {
        match self {
            ExecutionError::Failed { stdout, .. } | ExecutionError::TimedOut { stdout, .. } => {
                stdout
            }
            _ => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

/// Unified error type for the binary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usage / configuration error (exit code 2).
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) | AppError::Validation(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Return an optional human-readable hint that may help the user fix
    /// the problem.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Execution(ExecutionError::Launch { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Some("install ripgrep or point `ripgrep.binary` / --rg-path at it")
            }
            AppError::Execution(ExecutionError::Launch { source, .. })
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                Some("check that the ripgrep binary is executable")
            }
            AppError::Execution(ExecutionError::TimedOut { .. }) => {
                Some("raise `ripgrep.timeout_secs` or narrow the search path")
            }
            AppError::Validation(ValidationError::InvalidArguments(_)) => {
                Some("`--args` must be a JSON object of tool parameters")
            }
            _ => None,
        }
    }
}
