//! Output normalization: ANSI stripping and empty-result placeholders.

use std::sync::OnceLock;

use regex::Regex;

use crate::request::Operation;

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CSI (`ESC [ params intermediates final`) and OSC (`ESC ] ... BEL|ST`).
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)")
            .expect("ANSI pattern is valid")
    })
}

/// Remove terminal color and style escape sequences.
pub fn strip_ansi(text: &str) -> String {
    ansi_regex().replace_all(text, "").into_owned()
}

/// Strip escapes unless colors were requested. With `use_colors` the
/// input comes back unchanged.
pub fn normalize(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.to_string()
    } else {
        strip_ansi(text)
    }
}

/// Normalize the tool's stdout for `op` and substitute the operation's
/// placeholder when nothing is left.
pub fn render(op: Operation, stdout: &str, use_colors: bool) -> String {
    let text = normalize(stdout, use_colors);
    if text.trim().is_empty() {
        op.empty_placeholder().to_string()
    } else {
        text
    }
}
