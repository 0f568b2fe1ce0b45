//! Typed tool requests.
//!
//! Each MCP tool has its own argument struct, deserialized from the JSON
//! `arguments` object (camelCase keys) and validated once here. Everything
//! downstream works with these types and never touches raw JSON.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ValidationError;

/// The fixed set of operations exposed as MCP tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    AdvancedSearch,
    CountMatches,
    ListFiles,
    ListFileTypes,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Search,
        Operation::AdvancedSearch,
        Operation::CountMatches,
        Operation::ListFiles,
        Operation::ListFileTypes,
    ];

    /// Look up an operation by its tool name. Unknown names yield `None`,
    /// which callers must treat differently from a validation failure.
    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::AdvancedSearch => "advanced-search",
            Operation::CountMatches => "count-matches",
            Operation::ListFiles => "list-files",
            Operation::ListFileTypes => "list-file-types",
        }
    }

    /// Text returned instead of an empty result.
    pub fn empty_placeholder(self) -> &'static str {
        match self {
            Operation::Search | Operation::AdvancedSearch | Operation::CountMatches => {
                "No matches found."
            }
            Operation::ListFiles => "No files found.",
            Operation::ListFileTypes => "Failed to get file types.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Per-operation arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub path: String,
    /// `None` leaves ripgrep's own smart-case behavior in charge.
    pub case_sensitive: Option<bool>,
    pub file_pattern: Option<String>,
    pub max_results: Option<u64>,
    pub context: Option<u64>,
    #[serde(default)]
    pub use_colors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSearchRequest {
    #[serde(flatten)]
    pub search: SearchRequest,
    #[serde(default)]
    pub fixed_strings: bool,
    pub file_type: Option<String>,
    #[serde(default)]
    pub invert_match: bool,
    #[serde(default)]
    pub word_match: bool,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub show_filenames_only: bool,
    /// Unspecified behaves like `Some(true)`.
    pub show_line_numbers: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountMatchesRequest {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub path: String,
    pub case_sensitive: Option<bool>,
    pub file_pattern: Option<String>,
    /// `true` counts matching lines, `false` counts every match.
    #[serde(default = "default_true")]
    pub count_lines: bool,
    #[serde(default)]
    pub use_colors: bool,
}

impl Default for CountMatchesRequest {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            path: String::new(),
            case_sensitive: None,
            file_pattern: None,
            count_lines: true,
            use_colors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesRequest {
    #[serde(default)]
    pub path: String,
    pub file_pattern: Option<String>,
    pub file_type: Option<String>,
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

/// A fully validated request for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Search(SearchRequest),
    AdvancedSearch(AdvancedSearchRequest),
    CountMatches(CountMatchesRequest),
    ListFiles(ListFilesRequest),
    ListFileTypes,
}

impl ToolRequest {
    /// Deserialize and validate `args` for `op`.
    ///
    /// A missing or `null` argument object is treated as `{}` so that the
    /// required-parameter checks report which field is absent.
    pub fn parse(op: Operation, args: &Value) -> Result<ToolRequest, ValidationError> {
        let empty = Value::Object(Default::default());
        let args = if args.is_null() { &empty } else { args };
        if !args.is_object() {
            return Err(ValidationError::InvalidArguments(
                "arguments must be a JSON object".into(),
            ));
        }

        let request = match op {
            Operation::Search => ToolRequest::Search(decode(args)?),
            Operation::AdvancedSearch => ToolRequest::AdvancedSearch(decode(args)?),
            Operation::CountMatches => ToolRequest::CountMatches(decode(args)?),
            Operation::ListFiles => ToolRequest::ListFiles(decode(args)?),
            Operation::ListFileTypes => ToolRequest::ListFileTypes,
        };
        request.validate(args)?;
        Ok(request)
    }

    pub fn operation(&self) -> Operation {
        match self {
            ToolRequest::Search(_) => Operation::Search,
            ToolRequest::AdvancedSearch(_) => Operation::AdvancedSearch,
            ToolRequest::CountMatches(_) => Operation::CountMatches,
            ToolRequest::ListFiles(_) => Operation::ListFiles,
            ToolRequest::ListFileTypes => Operation::ListFileTypes,
        }
    }

    /// Whether ANSI sequences in the output should be kept.
    pub fn use_colors(&self) -> bool {
        match self {
            ToolRequest::Search(r) => r.use_colors,
            ToolRequest::AdvancedSearch(r) => r.search.use_colors,
            ToolRequest::CountMatches(r) => r.use_colors,
            ToolRequest::ListFiles(_) | ToolRequest::ListFileTypes => false,
        }
    }

    fn validate(&self, raw: &Value) -> Result<(), ValidationError> {
        match self {
            ToolRequest::Search(r) => require_pattern_and_path(raw, &r.pattern, &r.path),
            ToolRequest::AdvancedSearch(r) => {
                require_pattern_and_path(raw, &r.search.pattern, &r.search.path)
            }
            ToolRequest::CountMatches(r) => require_pattern_and_path(raw, &r.pattern, &r.path),
            ToolRequest::ListFiles(r) => require_non_empty(raw, "path", &r.path),
            ToolRequest::ListFileTypes => Ok(()),
        }
    }
}

fn decode<T: DeserializeOwned>(args: &Value) -> Result<T, ValidationError> {
    T::deserialize(args).map_err(|e| ValidationError::InvalidArguments(e.to_string()))
}

fn require_pattern_and_path(raw: &Value, pattern: &str, path: &str) -> Result<(), ValidationError> {
    require_non_empty(raw, "pattern", pattern)?;
    require_non_empty(raw, "path", path)
}

/// Distinguishes an absent key from an empty string for clearer messages.
fn require_non_empty(raw: &Value, key: &'static str, value: &str) -> Result<(), ValidationError> {
    if raw.get(key).is_none_or(Value::is_null) {
        return Err(ValidationError::MissingParameter(key));
    }
    if value.is_empty() {
        return Err(ValidationError::EmptyParameter(key));
    }
    Ok(())
}
