//! The call-handling boundary: validate, build, execute, normalize.
//!
//! [`ServerContext`] is constructed once at start-up and handed to the
//! transport. Every failure of a single call is converted into a
//! [`ToolResponse`] here; nothing propagates past this point.

use serde_json::Value;

use crate::command::CommandBuilder;
use crate::errors::{ExecutionError, ValidationError};
use crate::executor::{ExecutionOutcome, Executor};
use crate::normalize;
use crate::request::{Operation, ToolRequest};

/// Text content for the client, optionally flagged as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Everything a call needs: how to build commands and how to run them.
#[derive(Debug)]
pub struct ServerContext<E> {
    builder: CommandBuilder,
    executor: E,
}

impl<E: Executor> ServerContext<E> {
    pub fn new(builder: CommandBuilder, executor: E) -> Self {
        Self { builder, executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Handle a call by tool name. Returns `None` for names that are not
    /// one of ours so the transport can apply its own fallback.
    pub fn call(&self, name: &str, args: &Value) -> Option<ToolResponse> {
        let op = Operation::from_name(name)?;
        Some(self.call_operation(op, args))
    }

    pub fn call_operation(&self, op: Operation, args: &Value) -> ToolResponse {
        tracing::debug!(operation = %op, "tool call");
        match ToolRequest::parse(op, args) {
            Ok(request) => self.run(&request),
            Err(e) => validation_response(op, &e),
        }
    }

    /// Run an already validated request.
    pub fn run(&self, request: &ToolRequest) -> ToolResponse {
        let op = request.operation();
        let spec = self.builder.build(request);

        match self.executor.execute(&spec) {
            Ok(ExecutionOutcome::Matches(result)) => ToolResponse::success(normalize::render(
                op,
                &result.stdout,
                request.use_colors(),
            )),
            // Usually empty; any explanatory stdout is kept.
            Ok(ExecutionOutcome::NoMatches(result)) => {
                tracing::debug!(operation = %op, "no matches");
                ToolResponse::success(normalize::render(op, &result.stdout, false))
            }
            Err(e) => {
                tracing::warn!(operation = %op, command = %spec, error = %e, "command failed");
                execution_response(&e)
            }
        }
    }
}

fn validation_response(op: Operation, err: &ValidationError) -> ToolResponse {
    tracing::warn!(operation = %op, error = %err, "rejected tool arguments");
    ToolResponse::error(format!("Error: {err}"))
}

/// Failure message first, then whatever the tool printed on stderr.
fn execution_response(err: &ExecutionError) -> ToolResponse {
    let stderr = normalize::strip_ansi(err.stderr());
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        ToolResponse::error(format!("Error: {err}"))
    } else {
        ToolResponse::error(format!("Error: {err}\n{stderr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::command::CommandSpec;

    /// Records every command and replays a canned exit status.
    struct RecordingExecutor {
        calls: RefCell<Vec<CommandSpec>>,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    }

    impl RecordingExecutor {
        fn new(code: i32, stdout: &str, stderr: &str) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                code: Some(code),
                stdout: stdout.into(),
                stderr: stderr.into(),
            }
        }

        fn calls(&self) -> Vec<CommandSpec> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for RecordingExecutor {
        fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError> {
            self.calls.borrow_mut().push(spec.clone());
            crate::executor::classify(self.code, self.stdout.clone(), self.stderr.clone())
        }
    }

    struct MissingBinary;

    impl Executor for MissingBinary {
        fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError> {
            Err(ExecutionError::Launch {
                program: spec.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            })
        }
    }

    fn context(executor: RecordingExecutor) -> ServerContext<RecordingExecutor> {
        ServerContext::new(CommandBuilder::new("rg"), executor)
    }

    #[test]
    fn empty_pattern_never_reaches_executor() {
        let ctx = context(RecordingExecutor::new(0, "x", ""));
        let resp = ctx.call("search", &json!({"pattern": "", "path": "."})).unwrap();
        assert!(resp.is_error);
        assert!(resp.text.contains("pattern"));
        assert!(ctx.executor().calls().is_empty());
    }

    #[test]
    fn unknown_tool_is_none() {
        let ctx = context(RecordingExecutor::new(0, "", ""));
        assert!(ctx.call("regex-replace", &json!({})).is_none());
        assert!(ctx.executor().calls().is_empty());
    }

    #[test]
    fn matches_are_returned_stripped() {
        let ctx = context(RecordingExecutor::new(0, "\x1b[35ma.rs\x1b[0m:1:hit\n", ""));
        let resp = ctx.call("search", &json!({"pattern": "hit", "path": "."})).unwrap();
        assert_eq!(resp, ToolResponse::success("a.rs:1:hit\n"));
    }

    #[test]
    fn colors_kept_when_requested() {
        let raw = "\x1b[35ma.rs\x1b[0m:1:hit\n";
        let ctx = context(RecordingExecutor::new(0, raw, ""));
        let resp = ctx
            .call(
                "search",
                &json!({"pattern": "hit", "path": ".", "useColors": true}),
            )
            .unwrap();
        assert_eq!(resp.text, raw);
        let calls = ctx.executor().calls();
        assert!(calls[0].get_args().iter().any(|a| a == "always"));
    }

    #[test]
    fn list_files_always_stripped() {
        let ctx = context(RecordingExecutor::new(0, "\x1b[1msrc/a.rs\x1b[0m\n", ""));
        let resp = ctx
            .call("list-files", &json!({"path": ".", "useColors": true}))
            .unwrap();
        assert_eq!(resp.text, "src/a.rs\n");
    }

    #[test]
    fn exit_one_is_no_matches_response() {
        let ctx = context(RecordingExecutor::new(1, "", ""));
        let resp = ctx
            .call("search", &json!({"pattern": "absent", "path": "."}))
            .unwrap();
        assert_eq!(resp, ToolResponse::success("No matches found."));
        assert_eq!(ctx.executor().calls().len(), 1);
    }

    #[test]
    fn empty_listing_uses_placeholder() {
        let ctx = context(RecordingExecutor::new(0, "", ""));
        let resp = ctx.call("list-files", &json!({"path": "empty"})).unwrap();
        assert_eq!(resp, ToolResponse::success("No files found."));

        let resp = ctx.call("list-file-types", &json!({})).unwrap();
        assert_eq!(resp, ToolResponse::success("Failed to get file types."));
    }

    #[test]
    fn exit_two_is_error_with_stderr() {
        let ctx = context(RecordingExecutor::new(
            2,
            "",
            "rg: regex parse error:\n    (\n    ^\nerror: unclosed group\n",
        ));
        let resp = ctx
            .call("advanced-search", &json!({"pattern": "(", "path": "."}))
            .unwrap();
        assert!(resp.is_error);
        assert!(resp.text.contains("exit code 2"));
        assert!(resp.text.contains("unclosed group"));
    }

    #[test]
    fn missing_binary_is_error_response() {
        let ctx = ServerContext::new(CommandBuilder::new("rg"), MissingBinary);
        let resp = ctx.call("list-file-types", &json!({})).unwrap();
        assert!(resp.is_error);
        assert!(resp.text.contains("failed to launch rg"));
    }

    #[test]
    fn count_matches_defaults_to_count_lines() {
        let ctx = context(RecordingExecutor::new(0, "a.rs:2\n", ""));
        let resp = ctx
            .call("count-matches", &json!({"pattern": "x", "path": "."}))
            .unwrap();
        assert_eq!(resp.text, "a.rs:2\n");
        let calls = ctx.executor().calls();
        assert!(calls[0].get_args().iter().any(|a| a == "--count"));
        assert!(!calls[0].get_args().iter().any(|a| a == "--count-matches"));
    }

    #[test]
    fn invalid_argument_types_are_errors() {
        let ctx = context(RecordingExecutor::new(0, "", ""));
        let resp = ctx
            .call(
                "search",
                &json!({"pattern": "x", "path": ".", "caseSensitive": "yes"}),
            )
            .unwrap();
        assert!(resp.is_error);
        assert!(resp.text.starts_with("Error: invalid arguments"));
        assert!(ctx.executor().calls().is_empty());
    }

    #[test]
    fn run_accepts_prevalidated_request() {
        let ctx = context(RecordingExecutor::new(0, "rust: *.rs\n", ""));
        let resp = ctx.run(&ToolRequest::ListFileTypes);
        assert_eq!(resp.text, "rust: *.rs\n");
        assert_eq!(
            ctx.executor().calls()[0],
            CommandSpec::new("rg").args(["--type-list", "--color", "never"])
        );
    }
}
