// src/engine/ansi.rs

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences (colours, cursor movement), OSC sequences (titles,
/// hyperlinks) and two-byte escapes.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1B]*(?:\x07|\x1B\\)|[@-Z\\-_])")
        .expect("escape pattern is a valid regex")
});

/// Remove terminal escape sequences from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1B') {
        return Cow::Borrowed(text);
    }
    ANSI_ESCAPE.replace_all(text, "")
}
