//! BibTeX field extraction.
//!
//! Scans the text for `@type{key, name = value, ...}` entries (parentheses
//! are accepted in place of the outer braces). Values may be brace-delimited
//! with nesting, quoted, or bare words and numbers. `@comment`, `@preamble`
//! and `@string` blocks are skipped; string macros are not expanded.

use either::{Either, Left, Right};

/// Entry types that never describe a reference.
const NON_ENTRY_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// Raw fields of a single entry, before conversion to a [`crate::Record`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawBibtexEntry {
    pub(crate) entry_type: String,
    pub(crate) key: String,
    /// Field name (lower-cased) and cleaned value, in source order.
    pub(crate) fields: Vec<(String, String)>,
    /// Pieces of the entry body that were not `name = value` pairs.
    pub(crate) ignored: Vec<String>,
    /// Line on which the entry starts.
    pub(crate) line: usize,
}

/// Splits BibTeX text into entries. Unterminated or unnamed entries come
/// back as `Left((line, message))`.
pub(crate) fn bibtex_parse(text: &str) -> Vec<Either<(usize, String), RawBibtexEntry>> {
    let mut results = Vec::new();
    let mut rest = 0;

    while let Some(offset) = text[rest..].find('@') {
        let start = rest + offset;
        let line = line_number(text, start);
        let after_at = &text[start + 1..];

        let type_len = after_at
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
            .unwrap_or(after_at.len());
        let entry_type = after_at[..type_len].to_lowercase();
        let open_at = start + 1 + type_len;
        let Some((open_offset, open)) = text[open_at..]
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
        else {
            break;
        };

        if entry_type.is_empty() || (open != '{' && open != '(') {
            // a stray '@', e.g. inside free text between entries
            rest = start + 1;
            continue;
        }

        let body_start = open_at + open_offset + 1;
        let close = if open == '{' { '}' } else { ')' };
        let Some(body_len) = find_closing(&text[body_start..], close) else {
            results.push(Left((line, format!("unterminated @{entry_type} entry"))));
            break;
        };
        rest = body_start + body_len + 1;

        if NON_ENTRY_TYPES.contains(&entry_type.as_str()) {
            continue;
        }
        results.push(parse_body(&entry_type, &text[body_start..body_start + body_len], line));
    }

    results
}

fn line_number(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Byte offset of the `close` delimiter that ends a body, honouring nested braces.
fn find_closing(body: &str, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            c if c == close && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits on commas that are outside braces and quotes.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut in_quotes, mut last) = (0usize, false, 0);
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 => in_quotes = !in_quotes,
            ',' if depth == 0 && !in_quotes => {
                parts.push(&body[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[last..]);
    parts
}

fn parse_body(entry_type: &str, body: &str, line: usize) -> Either<(usize, String), RawBibtexEntry> {
    let mut parts = split_top_level(body).into_iter();
    let key = parts.next().unwrap_or_default().trim();
    if key.is_empty() || key.contains('=') {
        return Left((line, format!("@{entry_type} entry has no citation key")));
    }

    let mut entry = RawBibtexEntry {
        entry_type: entry_type.to_string(),
        key: key.to_string(),
        fields: Vec::new(),
        ignored: Vec::new(),
        line,
    };
    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => entry
                .fields
                .push((name.trim().to_lowercase(), clean_value(value))),
            _ => entry.ignored.push(part.to_string()),
        }
    }
    Right(entry)
}

/// Strips the outer delimiters and collapses the line breaks of a value.
pub(crate) fn clean_value(value: &str) -> String {
    let value = value.trim();
    let inner = if is_wrapped(value, '{', '}') || is_wrapped(value, '"', '"') {
        &value[1..value.len() - 1]
    } else {
        value
    };
    inner.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `value` is exactly one `open … close` group.
fn is_wrapped(value: &str, open: char, close: char) -> bool {
    if value.len() < 2 || !value.starts_with(open) || !value.ends_with(close) {
        return false;
    }
    if open == '"' {
        return true;
    }
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != value.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}
