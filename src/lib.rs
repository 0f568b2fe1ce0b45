//! ripgrep as a set of MCP tools.
//!
//! A `tools/call` flows through [`request`] (typed, validated arguments),
//! [`command`] (ripgrep argv), [`executor`] (child process) and
//! [`normalize`] (escape stripping, placeholders), tied together by
//! [`service::ServerContext`] and served over stdio by [`mcp`].

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod mcp;
pub mod normalize;
pub mod request;
pub mod router;
pub mod service;
