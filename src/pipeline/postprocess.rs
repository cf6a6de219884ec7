//! Post-processing: deterministic cleanup of model-generated captions and
//! descriptions.
//!
//! The prompts ask for bare prose, but models still occasionally wrap the
//! answer in code fences, quote it, or prefix it with "Caption:". These
//! rules remove that packaging without touching the content itself.
//!
//! ## Rule Order
//!
//! Line endings are normalised before fences are stripped (the fence regex
//! expects `\n`), and labels before quotes so `Caption: "..."` unwraps fully.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model output.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Strip a leading `Caption:` / `Description:` label
/// 4. Strip wrapping quotes
/// 5. Remove invisible Unicode
/// 6. Trim trailing whitespace per line
/// 7. Collapse 3+ consecutive newlines to a single blank line
/// 8. Trim the whole text
pub fn clean_model_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_code_fences(&s);
    let s = strip_leading_label(&s);
    let s = strip_wrapping_quotes(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Strip a leading label ────────────────────────────────────────────

static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(caption|description|loss description)\s*:\s*").unwrap()
});

fn strip_leading_label(input: &str) -> String {
    RE_LABEL.replace(input, "").to_string()
}

// ── Rule 4: Strip wrapping quotes ────────────────────────────────────────────

fn strip_wrapping_quotes(input: &str) -> String {
    let t = input.trim();
    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\'')] {
        if let Some(inner) = t.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            // Only unwrap a single quoted span, not `"a" and "b"`.
            if !inner.contains(close) {
                return inner.to_string();
            }
        }
    }
    t.to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
