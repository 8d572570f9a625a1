//! Binary text extraction: best-effort text recovery from uploaded
//! documents. Every strategy is total. Unreadable input yields an empty
//! string, never an error, and the orchestrator decides whether the result
//! is usable.

use std::io::Read;

/// Minimum printable-ASCII run kept from a PDF content stream.
const MIN_STREAM_RUN: usize = 5;
/// Minimum printable run kept from an unrecognized binary.
const MIN_BINARY_RUN: usize = 4;

/// Declared container format of an upload, derived from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Doc,
    Text,
}

impl FileKind {
    /// Maps a declared filename (or storage path) to a supported format.
    /// Returns `None` for anything outside the supported set.
    pub fn from_path(path: &str) -> Option<FileKind> {
        let extension = path.rsplit('.').next()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "doc" => Some(FileKind::Doc),
            "txt" | "text" => Some(FileKind::Text),
            _ => None,
        }
    }
}

/// Recovers a best-effort plain-text rendition of `bytes`.
/// Never fails; the result may be empty.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> String {
    match kind {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
        FileKind::Doc => extract_binary(bytes),
        FileKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Heuristic PDF text recovery. Not a content-stream interpreter: literal
/// string operands `(...)` are unescaped and kept, and printable runs inside
/// `stream`/`endstream` blocks are kept as secondary signal. Compressed
/// content streams extract little or nothing; that limitation is accepted
/// and surfaced as short output, not masked.
fn extract_pdf(bytes: &[u8]) -> String {
    let mut runs = literal_string_runs(bytes);
    runs.extend(stream_block_runs(bytes));
    runs.join(" ")
}

/// Scans for literal string operands between balanced `(`...`)`, handling
/// backslash escapes and up-to-three-digit octal codes. Runs with no
/// alphabetic character are treated as binary noise and dropped.
fn literal_string_runs(bytes: &[u8]) -> Vec<String> {
    let chars: Vec<char> = bytes.iter().map(|&b| b as char).collect();
    let mut runs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '(' {
            i += 1;
            continue;
        }
        i += 1;

        let mut depth = 1usize;
        let mut literal = String::new();
        while i < chars.len() && depth > 0 {
            match chars[i] {
                '\\' => {
                    i += 1;
                    if i >= chars.len() {
                        break;
                    }
                    match chars[i] {
                        'n' => literal.push('\n'),
                        'r' => literal.push('\r'),
                        't' => literal.push('\t'),
                        '0'..='7' => {
                            let mut value = 0u32;
                            let mut digits = 0;
                            while digits < 3 && i < chars.len() {
                                match chars[i].to_digit(8) {
                                    Some(d) => value = value * 8 + d,
                                    None => break,
                                }
                                digits += 1;
                                i += 1;
                            }
                            i -= 1;
                            if let Some(c) = char::from_u32(value) {
                                literal.push(c);
                            }
                        }
                        escaped => literal.push(escaped),
                    }
                }
                '(' => {
                    depth += 1;
                    literal.push('(');
                }
                ')' => {
                    depth -= 1;
                    if depth > 0 {
                        literal.push(')');
                    }
                }
                c => literal.push(c),
            }
            i += 1;
        }

        if literal.chars().any(|c| c.is_alphabetic()) {
            runs.push(literal);
        }
    }

    runs
}

/// Secondary signal: printable-ASCII runs inside stream blocks. Compressed
/// streams yield almost no qualifying runs.
fn stream_block_runs(bytes: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_subsequence(bytes, b"stream", pos) {
        let body_start = start + b"stream".len();
        let Some(end) = find_subsequence(bytes, b"endstream", body_start) else {
            break;
        };
        runs.extend(printable_runs(&bytes[body_start..end], MIN_STREAM_RUN));
        pos = end + b"endstream".len();
    }

    runs
}

/// Crude signal for legacy binary formats: lenient byte decode, printable
/// runs only. Quality is low by design; complex files extract poorly.
fn extract_binary(bytes: &[u8]) -> String {
    printable_runs(bytes, MIN_BINARY_RUN).join(" ")
}

fn printable_runs(bytes: &[u8], min_len: usize) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for &b in bytes {
        let c = b as char;
        if (' '..='~').contains(&c) {
            current.push(c);
        } else {
            flush_run(&mut current, min_len, &mut runs);
        }
    }
    flush_run(&mut current, min_len, &mut runs);
    runs
}

fn flush_run(current: &mut String, min_len: usize, runs: &mut Vec<String>) {
    let trimmed = current.trim();
    if trimmed.len() >= min_len && trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
        runs.push(trimmed.to_string());
    }
    current.clear();
}

fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + from)
}

/// A DOCX file is a ZIP container; the document body lives in
/// `word/document.xml`. Text runs (`<w:t>`) are concatenated per paragraph
/// (`<w:p>`), paragraphs separated by newlines. Any container or encoding
/// problem yields an empty string.
fn extract_docx(bytes: &[u8]) -> String {
    let cursor = std::io::Cursor::new(bytes);
    let Ok(mut archive) = zip::ZipArchive::new(cursor) else {
        return String::new();
    };

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut entry) => {
            if entry.read_to_string(&mut xml).is_err() {
                return String::new();
            }
        }
        Err(_) => return String::new(),
    }

    document_xml_text(&xml)
}

fn document_xml_text(xml: &str) -> String {
    let mut paragraphs = Vec::new();
    for chunk in xml.split("</w:p>") {
        let text = text_run_contents(chunk);
        let text = text.trim();
        if !text.is_empty() {
            paragraphs.push(text.to_string());
        }
    }
    paragraphs.join("\n")
}

/// Collects the contents of every `<w:t>` element in `chunk`, skipping
/// look-alike tags such as `<w:tbl>` and `<w:tab/>`.
fn text_run_contents(chunk: &str) -> String {
    let mut out = String::new();
    let mut pos = 0;

    while let Some(rel) = chunk[pos..].find("<w:t") {
        let tag_start = pos + rel;
        let after_tag = tag_start + "<w:t".len();

        let Some(next) = chunk[after_tag..].chars().next() else {
            break;
        };
        if next != '>' && next != '/' && !next.is_whitespace() {
            pos = after_tag;
            continue;
        }

        let Some(gt_rel) = chunk[after_tag..].find('>') else {
            break;
        };
        let content_start = after_tag + gt_rel + 1;
        if chunk[..content_start].ends_with("/>") {
            pos = content_start;
            continue;
        }

        let Some(close_rel) = chunk[content_start..].find("</w:t>") else {
            break;
        };
        out.push_str(&unescape_xml(&chunk[content_start..content_start + close_rel]));
        pos = content_start + close_rel + "</w:t>".len();
    }

    out
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
