//! Post-processing: deterministic hygiene on raw OCR output.
//!
//! Tesseract's stdout carries artefacts that are not page content: a form
//! feed after every page, stray NUL bytes on some builds, CRLF line endings on
//! Windows, and trailing spaces on most lines. These rules remove them without
//! touching the recognised characters.
//!
//! ZWJ and ZWNJ are deliberately kept: Devanagari uses them to select conjunct
//! and half-letter forms, so stripping them changes Marathi words.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of OCR output.
///
/// Rules (applied in order):
/// 1. Drop NUL bytes and form feeds
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of 3+ blank lines down to 2
/// 5. Strip invisible Unicode (zero-width space, BOM, soft hyphen, word joiner)
///
/// Leading and trailing blank lines are left alone; the file sink trims the
/// whole page when it writes it.
pub fn clean_text(input: &str) -> String {
    let s = strip_control_chars(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    remove_invisible_chars(&s)
}

// ── Rule 1: Strip NUL / form feed ────────────────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input.replace(['\u{0000}', '\u{000C}'], "")
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    let mut out = input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    if input.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}'], "")
}
