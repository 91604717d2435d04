//! Lenient recovery of JSON values from damaged text.
//!
//! Exports are sometimes several arrays glued together (`[...][...]`),
//! truncated mid-object, or interleaved with stray separators. The extractor
//! walks the text with a cursor and keeps every value it can parse.

use serde_json::Value;

/// Recover the top-level JSON values contained in `text`.
///
/// A leading `[` is stepped over so the elements of a (possibly broken)
/// outer array come back individually. Whitespace, `,` and `]` between values
/// are skipped; anything that fails to parse is skipped one character at a
/// time. Never fails: the result may be empty.
pub fn extract_json_values(text: &str) -> Vec<Value> {
    let text = text.trim();
    let mut values = Vec::new();
    let mut pos = if text.starts_with('[') { 1 } else { 0 };

    while pos < text.len() {
        pos = skip_noise(text, pos);
        if pos >= text.len() {
            break;
        }

        match parse_one(&text[pos..]) {
            Some((value, consumed)) => {
                values.push(value);
                pos += consumed;
            }
            None => pos += char_len_at(text, pos),
        }
    }

    values
}

/// Advance past whitespace and the separators `,` and `]`.
fn skip_noise(text: &str, mut pos: usize) -> usize {
    while let Some(c) = text[pos..].chars().next() {
        if c.is_whitespace() || c == ',' || c == ']' {
            pos += c.len_utf8();
        } else {
            break;
        }
    }
    pos
}

/// Parse exactly one JSON value at the start of `rest`, returning it with the
/// number of bytes it spans.
fn parse_one(rest: &str) -> Option<(Value, usize)> {
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => {
            let consumed = stream.byte_offset();
            (consumed > 0).then_some((value, consumed))
        }
        _ => None,
    }
}

fn char_len_at(text: &str, pos: usize) -> usize {
    text[pos..].chars().next().map(char::len_utf8).unwrap_or(1)
}
