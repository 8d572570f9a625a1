//! Text normalization and truncation ahead of the extraction call.
//!
//! Cleaning strips characters outside a conservative allow-list and collapses
//! whitespace. Line breaks survive as single `\n` because the fallback
//! extractor's heuristics are line- and section-oriented; everything else
//! collapses to single spaces.

/// How far back from the cut point to look for a space before giving up and
/// hard-truncating mid-word.
const TRUNCATE_LOOKBACK: usize = 30;

/// Cleans `raw` and bounds it to `max_chars` characters, cutting at a word
/// boundary where one exists within the lookback window.
pub fn normalize(raw: &str, max_chars: usize) -> String {
    truncate_at_boundary(clean(raw), max_chars)
}

fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    let mut pending_newline = false;

    for c in raw.chars() {
        if c == '\n' || c == '\r' {
            pending_newline = true;
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !is_allowed(c) {
            continue;
        }
        if !out.is_empty() {
            if pending_newline {
                out.push('\n');
            } else if pending_space {
                out.push(' ');
            }
        }
        pending_space = false;
        pending_newline = false;
        out.push(c);
    }

    out
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '@' | '.'
                | '-'
                | ','
                | '_'
                | '('
                | ')'
                | '/'
                | ':'
                | ';'
                | '\''
                | '"'
                | '&'
                | '+'
                | '#'
                | '!'
                | '?'
                | '%'
                | '$'
                | '*'
        )
}

fn truncate_at_boundary(text: String, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text;
    }

    let window_start = max_chars.saturating_sub(TRUNCATE_LOOKBACK);
    let boundary = (window_start..=max_chars)
        .rev()
        .find(|&i| chars[i] == ' ' || chars[i] == '\n');

    let cut = boundary.unwrap_or(max_chars);
    chars[..cut].iter().collect()
}
