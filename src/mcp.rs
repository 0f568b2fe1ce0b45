//! MCP (Model Context Protocol) server over stdio.
//!
//! Implements a JSON-RPC 2.0 server that exposes ripgrep as five MCP tools.
//! Designed for AI coding assistants via the `mcp-ripgrep serve` command.
//!
//! Transport: NDJSON over stdin/stdout. No async runtime required.

use std::io::{self, BufRead, Write};
use std::sync::OnceLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executor::Executor;
use crate::service::{ServerContext, ToolResponse};

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

const JSONRPC_VERSION: &str = "2.0";
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RequestId {
    Number(i64),
    Str(String),
    Null,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl Response {
    fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

const PROTOCOL_VERSION: &str = "2025-11-25";
/// Revisions we can speak, newest first. A client asking for one of these
/// gets it echoed back; anything else gets [`PROTOCOL_VERSION`].
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &[PROTOCOL_VERSION, "2025-06-18", "2025-03-26", "2024-11-05"];
const SERVER_NAME: &str = "mcp-ripgrep";

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    type_: &'static str,
    text: String,
}

impl From<ToolResponse> for CallToolResult {
    fn from(resp: ToolResponse) -> Self {
        Self {
            content: vec![Content {
                type_: "text",
                text: resp.text,
            }],
            is_error: resp.is_error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn pattern_schema() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "The search pattern (regex by default)"
    })
}

fn path_schema() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Directory or file(s) to search"
    })
}

fn bool_schema(description: &str) -> Value {
    serde_json::json!({ "type": "boolean", "description": description })
}

/// The five tools, built once.
pub fn tool_definitions() -> &'static Vec<Tool> {
    static TOOLS: OnceLock<Vec<Tool>> = OnceLock::new();
    TOOLS.get_or_init(|| {
        vec![
            Tool {
                name: "search",
                description: "Search files for patterns using ripgrep (rg). Shows matching lines with line numbers.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "pattern": pattern_schema(),
                        "path": path_schema(),
                        "caseSensitive": bool_schema("Use case sensitive search (default: auto / smart case)"),
                        "filePattern": {
                            "type": "string",
                            "description": "Filter by file type or glob (e.g. '*.rs')"
                        },
                        "maxResults": {
                            "type": "integer",
                            "description": "Limit the number of matching lines per file"
                        },
                        "context": {
                            "type": "integer",
                            "description": "Show N lines before and after each match"
                        },
                        "useColors": bool_schema("Keep ANSI color codes in the output (default: false)")
                    },
                    "required": ["pattern", "path"]
                }),
            },
            Tool {
                name: "advanced-search",
                description: "Advanced search with ripgrep exposing more options: literal strings, file types, inverted and whole-word matching, hidden files, symlinks.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "pattern": pattern_schema(),
                        "path": path_schema(),
                        "caseSensitive": bool_schema("Use case sensitive search (default: auto / smart case)"),
                        "fixedStrings": bool_schema("Treat the pattern as a literal string, not a regex"),
                        "filePattern": {
                            "type": "string",
                            "description": "Filter by glob (e.g. '*.rs')"
                        },
                        "fileType": {
                            "type": "string",
                            "description": "Filter by ripgrep file type (e.g. 'rust', 'js'); see list-file-types"
                        },
                        "maxResults": {
                            "type": "integer",
                            "description": "Limit the number of matching lines per file"
                        },
                        "context": {
                            "type": "integer",
                            "description": "Show N lines before and after each match"
                        },
                        "invertMatch": bool_schema("Show lines that do not match"),
                        "wordMatch": bool_schema("Only match whole words"),
                        "includeHidden": bool_schema("Search hidden files and directories"),
                        "followSymlinks": bool_schema("Follow symbolic links"),
                        "showFilenamesOnly": bool_schema("Only print paths of files with matches"),
                        "showLineNumbers": bool_schema("Show line numbers (default: true)"),
                        "useColors": bool_schema("Keep ANSI color codes in the output (default: false)")
                    },
                    "required": ["pattern", "path"]
                }),
            },
            Tool {
                name: "count-matches",
                description: "Count matches per file using ripgrep.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "pattern": pattern_schema(),
                        "path": path_schema(),
                        "caseSensitive": bool_schema("Use case sensitive search (default: auto / smart case)"),
                        "filePattern": {
                            "type": "string",
                            "description": "Filter by glob (e.g. '*.rs')"
                        },
                        "countLines": bool_schema("Count matching lines (true, default) or every individual match (false)"),
                        "useColors": bool_schema("Keep ANSI color codes in the output (default: false)")
                    },
                    "required": ["pattern", "path"]
                }),
            },
            Tool {
                name: "list-files",
                description: "List the files ripgrep would search, without searching them.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": path_schema(),
                        "filePattern": {
                            "type": "string",
                            "description": "Filter by glob (e.g. '*.rs')"
                        },
                        "fileType": {
                            "type": "string",
                            "description": "Filter by ripgrep file type (e.g. 'rust', 'js')"
                        },
                        "includeHidden": bool_schema("Include hidden files and directories")
                    },
                    "required": ["path"]
                }),
            },
            Tool {
                name: "list-file-types",
                description: "List every file type ripgrep knows, with its globs.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    })
}

fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|s| *s == v))
        .unwrap_or(PROTOCOL_VERSION)
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

pub struct McpServer<E> {
    context: ServerContext<E>,
}

impl<E: Executor> McpServer<E> {
    pub fn new(context: ServerContext<E>) -> Self {
        Self { context }
    }

    fn handle_initialize(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        serde_json::to_value(InitializeResult {
            protocol_version: negotiate_protocol_version(requested),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
            },
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
        })
        .expect("serialize InitializeResult")
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_definitions() })
    }

    /// `Err` carries a JSON-RPC error: malformed params or a tool name that
    /// is not one of ours. Everything else is a tool result, failed calls
    /// included.
    fn handle_tools_call(&self, params: &Value) -> Result<Value, (i64, String)> {
        let call: CallToolParams = serde_json::from_value(params.clone())
            .map_err(|_| (INVALID_PARAMS, "invalid tool call parameters".to_string()))?;

        let response = self
            .context
            .call(&call.name, &call.arguments)
            .ok_or_else(|| {
                tracing::warn!(tool = %call.name, "unknown tool");
                (INVALID_PARAMS, format!("unknown tool: {}", call.name))
            })?;

        Ok(serde_json::to_value(CallToolResult::from(response))
            .expect("serialize CallToolResult"))
    }

    /// Dispatch one parsed message. Returns `None` for notifications and
    /// for responses sent by the client.
    fn handle_message(&self, msg: &Value) -> Option<Response> {
        if msg.get("method").is_none()
            && (msg.get("result").is_some() || msg.get("error").is_some())
        {
            tracing::debug!("ignoring client response");
            return None;
        }
        // Notifications have no `id` field; handle silently.
        let id_val = msg.get("id")?;
        let id = match serde_json::from_value::<RequestId>(id_val.clone()) {
            Ok(id) => id,
            Err(_) => {
                return Some(Response::error(
                    RequestId::Null,
                    INVALID_REQUEST,
                    "invalid request id",
                ));
            }
        };

        let Some(method) = msg.get("method").and_then(|v| v.as_str()) else {
            return Some(Response::error(id, INVALID_REQUEST, "missing method"));
        };

        let empty_params = Value::Object(Default::default());
        let params = msg.get("params").unwrap_or(&empty_params);

        tracing::trace!(method, "request");
        let resp = match method {
            "initialize" => Response::success(id, self.handle_initialize(params)),
            "ping" => Response::success(id, serde_json::json!({})),
            "tools/list" => Response::success(id, self.handle_tools_list()),
            "tools/call" => match self.handle_tools_call(params) {
                Ok(result) => Response::success(id, result),
                Err((code, message)) => Response::error(id, code, message),
            },
            _ => Response::error(id, METHOD_NOT_FOUND, format!("unknown method: {method}")),
        };
        Some(resp)
    }

    /// Read NDJSON requests from `input` until EOF, writing one response
    /// line per request to `output`.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed, stopping");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let msg: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable request");
                    let resp = Response::error(RequestId::Null, PARSE_ERROR, "parse error");
                    write_response(&mut *output, &resp)?;
                    continue;
                }
            };

            if let Some(resp) = self.handle_message(&msg) {
                write_response(&mut *output, &resp)?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }
}

/// Run the MCP server on the process's stdin/stdout.
pub fn serve_stdio<E: Executor>(server: &McpServer<E>) -> Result<()> {
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    server.serve(stdin, &mut stdout)
}

fn write_response(out: &mut impl Write, resp: &Response) -> io::Result<()> {
    let json = serde_json::to_string(resp).expect("serialize Response");
    writeln!(out, "{json}")?;
    out.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
