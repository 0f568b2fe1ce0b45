//! Translation of validated tool requests into ripgrep invocations.
//!
//! Builders are pure: the same request always yields the same token
//! sequence. Flags are emitted in a fixed order per operation:
//!
//! case -> literal mode -> filters -> limits -> context -> behavioral
//! toggles -> display toggles -> color -> `--` -> pattern -> path
//!
//! Tokens go to the OS as argv, never through a shell. [`CommandSpec`] can
//! still render itself as a shell-safe line (see [`shell_quote`]) for logs
//! and for users who want to replay a call by hand.

use std::fmt;

use crate::request::{
    AdvancedSearchRequest, CountMatchesRequest, ListFilesRequest, SearchRequest, ToolRequest,
};

/// One external-process invocation: a program and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by arguments, as one token list.
    pub fn tokens(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Render as a single POSIX shell command line with every token quoted.
    pub fn to_shell_line(&self) -> String {
        self.tokens()
            .into_iter()
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    fn push_if(&mut self, cond: bool, flag: &str) {
        if cond {
            self.push(flag);
        }
    }

    fn push_value(&mut self, flag: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.push(flag);
            self.push(v);
        }
    }

    /// Limits and context counts are only emitted when positive.
    fn push_positive(&mut self, flag: &str, value: Option<u64>) {
        if let Some(n) = value.filter(|n| *n > 0) {
            self.push(flag);
            self.push(n.to_string());
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_line())
    }
}

// ---------------------------------------------------------------------------
// Shell quoting
// ---------------------------------------------------------------------------

/// Quote `s` so that a POSIX shell reads it back as exactly `s`.
///
/// Quoting is delegated to `shlex`: plain words stay bare, anything else is
/// single- or double-quoted as needed, so `;`, `|`, backticks, `$()` and
/// newlines are inert. A NUL byte cannot be expressed in a shell word; such
/// a token is rendered as a Rust string literal instead.
pub fn shell_quote(s: &str) -> String {
    match shlex::try_quote(s) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => format!("{s:?}"),
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Builds ripgrep command lines for a configured binary.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn build(&self, request: &ToolRequest) -> CommandSpec {
        match request {
            ToolRequest::Search(r) => self.search(r),
            ToolRequest::AdvancedSearch(r) => self.advanced_search(r),
            ToolRequest::CountMatches(r) => self.count_matches(r),
            ToolRequest::ListFiles(r) => self.list_files(r),
            ToolRequest::ListFileTypes => self.list_file_types(),
        }
    }

    pub fn search(&self, r: &SearchRequest) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program);
        push_case(&mut cmd, r.case_sensitive);
        cmd.push_value("--glob", r.file_pattern.as_deref());
        cmd.push_positive("--max-count", r.max_results);
        cmd.push_positive("--context", r.context);
        cmd.push("--line-number");
        push_color(&mut cmd, r.use_colors);
        push_positionals(&mut cmd, Some(&r.pattern), &r.path);
        cmd
    }

    pub fn advanced_search(&self, r: &AdvancedSearchRequest) -> CommandSpec {
        let base = &r.search;
        let mut cmd = CommandSpec::new(&self.program);
        push_case(&mut cmd, base.case_sensitive);
        cmd.push_if(r.fixed_strings, "--fixed-strings");
        cmd.push_value("--glob", base.file_pattern.as_deref());
        cmd.push_value("--type", r.file_type.as_deref());
        cmd.push_positive("--max-count", base.max_results);
        cmd.push_positive("--context", base.context);
        cmd.push_if(r.invert_match, "--invert-match");
        cmd.push_if(r.word_match, "--word-regexp");
        cmd.push_if(r.include_hidden, "--hidden");
        cmd.push_if(r.follow_symlinks, "--follow");
        cmd.push_if(r.show_filenames_only, "--files-with-matches");
        if r.show_line_numbers.unwrap_or(true) {
            cmd.push("--line-number");
        } else {
            cmd.push("--no-line-number");
        }
        push_color(&mut cmd, base.use_colors);
        push_positionals(&mut cmd, Some(&base.pattern), &base.path);
        cmd
    }

    pub fn count_matches(&self, r: &CountMatchesRequest) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program);
        push_case(&mut cmd, r.case_sensitive);
        cmd.push_value("--glob", r.file_pattern.as_deref());
        cmd.push(if r.count_lines {
            "--count"
        } else {
            "--count-matches"
        });
        push_color(&mut cmd, r.use_colors);
        push_positionals(&mut cmd, Some(&r.pattern), &r.path);
        cmd
    }

    pub fn list_files(&self, r: &ListFilesRequest) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program).arg("--files");
        cmd.push_value("--glob", r.file_pattern.as_deref());
        cmd.push_value("--type", r.file_type.as_deref());
        cmd.push_if(r.include_hidden, "--hidden");
        push_color(&mut cmd, false);
        push_positionals(&mut cmd, None, &r.path);
        cmd
    }

    pub fn list_file_types(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program).arg("--type-list");
        push_color(&mut cmd, false);
        cmd
    }
}

/// At most one case flag; `None` defers to ripgrep's smart case.
fn push_case(cmd: &mut CommandSpec, case_sensitive: Option<bool>) {
    match case_sensitive {
        Some(true) => cmd.push("--case-sensitive"),
        Some(false) => cmd.push("--ignore-case"),
        None => {}
    }
}

fn push_color(cmd: &mut CommandSpec, use_colors: bool) {
    cmd.push("--color");
    cmd.push(if use_colors { "always" } else { "never" });
}

// `--` keeps a pattern like `-foo` from being parsed as a flag.
fn push_positionals(cmd: &mut CommandSpec, pattern: Option<&str>, path: &str) {
    cmd.push("--");
    if let Some(p) = pattern {
        cmd.push(p);
    }
    cmd.push(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn builder() -> CommandBuilder {
        CommandBuilder::new("rg")
    }

    fn search(pattern: &str, path: &str) -> SearchRequest {
        SearchRequest {
            pattern: pattern.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    fn args(spec: &CommandSpec) -> Vec<&str> {
        spec.get_args().iter().map(String::as_str).collect()
    }

    /// Evaluate a quoted token with `sh` and return what the shell sees.
    fn shell_eval(quoted: &str) -> String {
        let out = Command::new("sh")
            .arg("-c")
            .arg(format!("printf '%s' {quoted}"))
            .output()
            .unwrap();
        assert!(out.status.success(), "sh failed for {quoted}");
        String::from_utf8(out.stdout).unwrap()
    }

    // -- search ---------------------------------------------------------------

    #[test]
    fn minimal_search() {
        let spec = builder().search(&search("needle", "."));
        assert_eq!(spec.program(), "rg");
        assert_eq!(
            args(&spec),
            ["--line-number", "--color", "never", "--", "needle", "."]
        );
    }

    #[test]
    fn full_search_flag_order() {
        let r = SearchRequest {
            pattern: "fn main".into(),
            path: "src".into(),
            case_sensitive: Some(true),
            file_pattern: Some("*.rs".into()),
            max_results: Some(10),
            context: Some(2),
            use_colors: true,
        };
        assert_eq!(
            args(&builder().search(&r)),
            [
                "--case-sensitive",
                "--glob",
                "*.rs",
                "--max-count",
                "10",
                "--context",
                "2",
                "--line-number",
                "--color",
                "always",
                "--",
                "fn main",
                "src",
            ]
        );
    }

    #[test]
    fn case_insensitive_flag() {
        let r = SearchRequest {
            case_sensitive: Some(false),
            ..search("x", ".")
        };
        let spec = builder().search(&r);
        assert_eq!(args(&spec)[0], "--ignore-case");
        assert!(!args(&spec).contains(&"--case-sensitive"));
    }

    #[test]
    fn smart_case_emits_no_case_flag() {
        let spec = builder().search(&search("x", "."));
        assert!(!args(&spec).contains(&"--ignore-case"));
        assert!(!args(&spec).contains(&"--case-sensitive"));
    }

    #[test]
    fn zero_limits_are_omitted() {
        let r = SearchRequest {
            max_results: Some(0),
            context: Some(0),
            ..search("x", ".")
        };
        let spec = builder().search(&r);
        assert!(!args(&spec).contains(&"--max-count"));
        assert!(!args(&spec).contains(&"--context"));
    }

    #[test]
    fn build_is_deterministic() {
        let r = SearchRequest {
            case_sensitive: Some(false),
            file_pattern: Some("*.md".into()),
            max_results: Some(3),
            ..search("a'b", "docs dir")
        };
        let first = builder().search(&r);
        for _ in 0..10 {
            assert_eq!(builder().search(&r), first);
        }
    }

    #[test]
    fn dash_pattern_follows_separator() {
        let spec = builder().search(&search("-v", "."));
        let a = args(&spec);
        let sep = a.iter().position(|t| *t == "--").unwrap();
        assert_eq!(a[sep + 1], "-v");
    }

    // -- advanced search --------------------------------------------------------

    fn advanced(pattern: &str) -> AdvancedSearchRequest {
        AdvancedSearchRequest {
            search: search(pattern, "."),
            ..Default::default()
        }
    }

    #[test]
    fn advanced_all_toggles_in_order() {
        let r = AdvancedSearchRequest {
            search: SearchRequest {
                case_sensitive: Some(false),
                file_pattern: Some("*.ts".into()),
                max_results: Some(1),
                context: Some(4),
                ..search("foo", "web")
            },
            fixed_strings: true,
            file_type: Some("ts".into()),
            invert_match: true,
            word_match: true,
            include_hidden: true,
            follow_symlinks: true,
            show_filenames_only: true,
            show_line_numbers: Some(true),
        };
        assert_eq!(
            args(&builder().advanced_search(&r)),
            [
                "--ignore-case",
                "--fixed-strings",
                "--glob",
                "*.ts",
                "--type",
                "ts",
                "--max-count",
                "1",
                "--context",
                "4",
                "--invert-match",
                "--word-regexp",
                "--hidden",
                "--follow",
                "--files-with-matches",
                "--line-number",
                "--color",
                "never",
                "--",
                "foo",
                "web",
            ]
        );
    }

    #[test]
    fn line_numbers_default_on() {
        let unspecified = builder().advanced_search(&advanced("x"));
        let explicit = builder().advanced_search(&AdvancedSearchRequest {
            show_line_numbers: Some(true),
            ..advanced("x")
        });
        assert_eq!(unspecified, explicit);
        assert!(args(&unspecified).contains(&"--line-number"));
    }

    #[test]
    fn line_numbers_explicit_off() {
        let spec = builder().advanced_search(&AdvancedSearchRequest {
            show_line_numbers: Some(false),
            ..advanced("x")
        });
        assert!(args(&spec).contains(&"--no-line-number"));
        assert!(!args(&spec).contains(&"--line-number"));
    }

    // -- count ------------------------------------------------------------------

    #[test]
    fn count_lines_by_default() {
        let r = CountMatchesRequest {
            pattern: "x".into(),
            path: ".".into(),
            ..Default::default()
        };
        let spec = builder().count_matches(&r);
        assert!(args(&spec).contains(&"--count"));
        assert!(!args(&spec).contains(&"--count-matches"));
    }

    #[test]
    fn count_total_matches() {
        let r = CountMatchesRequest {
            pattern: "x".into(),
            path: ".".into(),
            case_sensitive: Some(true),
            file_pattern: Some("*.rs".into()),
            count_lines: false,
            use_colors: false,
        };
        assert_eq!(
            args(&builder().count_matches(&r)),
            [
                "--case-sensitive",
                "--glob",
                "*.rs",
                "--count-matches",
                "--color",
                "never",
                "--",
                "x",
                ".",
            ]
        );
    }

    // -- listing ----------------------------------------------------------------

    #[test]
    fn list_files_has_no_pattern_and_no_color() {
        let r = ListFilesRequest {
            path: "src".into(),
            file_pattern: Some("*.rs".into()),
            file_type: Some("rust".into()),
            include_hidden: true,
        };
        assert_eq!(
            args(&builder().list_files(&r)),
            [
                "--files", "--glob", "*.rs", "--type", "rust", "--hidden", "--color", "never",
                "--", "src",
            ]
        );
    }

    #[test]
    fn list_file_types_is_fixed() {
        let spec = builder().build(&ToolRequest::ListFileTypes);
        assert_eq!(args(&spec), ["--type-list", "--color", "never"]);
    }

    #[test]
    fn configured_program_is_used() {
        let spec = CommandBuilder::new("/opt/bin/rg").list_file_types();
        assert_eq!(spec.program(), "/opt/bin/rg");
    }

    // -- quoting ----------------------------------------------------------------

    #[test]
    fn safe_tokens_stay_bare() {
        assert_eq!(shell_quote("needle"), "needle");
        assert_eq!(shell_quote("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn empty_string_is_quoted() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_eval(&shell_quote("")), "");
    }

    #[test]
    fn single_quote_is_quoted() {
        let quoted = shell_quote("O'Brien");
        assert_ne!(quoted, "O'Brien");
        assert_eq!(shell_eval(&quoted), "O'Brien");
    }

    #[test]
    fn nul_byte_falls_back_to_literal() {
        assert_eq!(shell_quote("a\0b"), "\"a\\0b\"");
    }

    #[test]
    fn quoting_round_trips_through_sh() {
        let inputs = [
            "O'Brien",
            "a b  c",
            "x; rm -rf /",
            "a | b",
            "`whoami`",
            "$(id)",
            "$HOME",
            "line1\nline2",
            "''''",
            "\"double\"",
            "back\\slash",
            "*.rs",
            "glob?[ab]",
            "tab\there",
            "ünïcödé ✓",
        ];
        for input in inputs {
            assert_eq!(shell_eval(&shell_quote(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn shell_line_quotes_user_values() {
        let spec = builder().search(&search("it's here", "my dir"));
        let line = spec.to_shell_line();
        let argv = line.strip_prefix("rg ").expect("program comes first");
        let out = Command::new("sh")
            .arg("-c")
            .arg(format!("printf '%s|' {argv}"))
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8(out.stdout).unwrap(),
            "--line-number|--color|never|--|it's here|my dir|"
        );
        assert_eq!(spec.to_string(), spec.to_shell_line());
    }

    #[test]
    fn tokens_include_program() {
        let spec = CommandSpec::new("sh").args(["-c", "true"]);
        assert_eq!(spec.tokens(), ["sh", "-c", "true"]);
    }
}
