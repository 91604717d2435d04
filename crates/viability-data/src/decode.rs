//! Best-effort decoding of export files.
//!
//! Every export goes through the same chain of strategies, tried left to
//! right until one yields a value:
//!
//! 1. [`DecodeStrategy::Direct`]: the text is valid JSON.
//! 2. [`DecodeStrategy::BracketSplice`]: concatenated arrays (`][`) are
//!    joined with a comma and the result parsed.
//! 3. [`DecodeStrategy::Extracted`]: the [lenient extractor](crate::extractor)
//!    recovers whatever values it can, wrapped as `{"items": [...]}`.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use viability_core::error::{ReportError, Result};

use crate::extractor::extract_json_values;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Which strategy of the chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecodeStrategy {
    Direct,
    BracketSplice,
    Extracted,
}

/// A successfully decoded export.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub value: Value,
    pub strategy: DecodeStrategy,
}

/// Nothing could be recovered from the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no JSON could be recovered: {diagnostic}")]
pub struct DecodeError {
    /// The error reported by the last strategy attempted.
    pub diagnostic: String,
}

type Strategy = fn(&str) -> std::result::Result<Value, String>;

const CHAIN: [(DecodeStrategy, Strategy); 3] = [
    (DecodeStrategy::Direct, decode_direct),
    (DecodeStrategy::BracketSplice, decode_bracket_splice),
    (DecodeStrategy::Extracted, decode_extracted),
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Run the decode chain over `text`, stopping at the first success.
pub fn decode_best_effort(text: &str) -> std::result::Result<Decoded, DecodeError> {
    let mut diagnostic = String::from("empty input");

    for (strategy, decode) in CHAIN {
        match decode(text) {
            Ok(value) => {
                if strategy != DecodeStrategy::Direct {
                    tracing::debug!(?strategy, "recovered malformed JSON");
                }
                return Ok(Decoded { value, strategy });
            }
            Err(e) => diagnostic = e,
        }
    }

    Err(DecodeError { diagnostic })
}

/// Read an export file as text.
///
/// Invalid UTF-8 sequences are replaced rather than rejected and a leading
/// byte-order mark is dropped.
pub fn read_export(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// How an `items` entry that is a single object (not a list) is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleItem {
    /// Yields no records.
    Reject,
    /// Counts as a one-element list.
    Wrap,
}

impl Decoded {
    /// The record objects carried by the decoded value.
    ///
    /// * a list is used directly;
    /// * an object contributes its `items` list; a single `items` object is
    ///   handled per `single`;
    /// * anything else yields no records.
    ///
    /// Values recovered by the extractor may include whole arrays that
    /// followed a broken separator; those are flattened one level. Elements
    /// that are not objects are dropped.
    pub fn into_records(self, single: SingleItem) -> Vec<Value> {
        let list = match self.value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => items,
                Some(obj @ Value::Object(_)) if single == SingleItem::Wrap => vec![obj],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let flattened: Vec<Value> = if self.strategy == DecodeStrategy::Extracted {
            list.into_iter()
                .flat_map(|v| match v {
                    Value::Array(inner) => inner,
                    other => vec![other],
                })
                .collect()
        } else {
            list
        };

        flattened.into_iter().filter(Value::is_object).collect()
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

fn decode_direct(text: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(text).map_err(|e| e.to_string())
}

fn decode_bracket_splice(text: &str) -> std::result::Result<Value, String> {
    if !text.contains("][") {
        return Err("no array boundary to splice".to_string());
    }
    serde_json::from_str(&text.replace("][", ",")).map_err(|e| e.to_string())
}

fn decode_extracted(text: &str) -> std::result::Result<Value, String> {
    let values = extract_json_values(text);
    if values.is_empty() {
        return Err("no JSON value found in text".to_string());
    }
    Ok(serde_json::json!({ "items": values }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_direct_decode() {
        let decoded = decode_best_effort(r#"[{"id": 1}]"#).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Direct);
        assert_eq!(decoded.value, json!([{"id": 1}]));
    }

    #[test]
    fn test_bracket_splice_decode() {
        let decoded = decode_best_effort(r#"[{"id": 1}][{"id": 2}]"#).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::BracketSplice);
        assert_eq!(
            decoded.into_records(SingleItem::Reject),
            vec![json!({"id": 1}), json!({"id": 2})]
        );
    }

    #[test]
    fn test_extracted_decode_of_truncated_text() {
        let decoded = decode_best_effort(r#"[{"id": 1}, {"id": 2}, {"id": "#).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Extracted);
        assert_eq!(
            decoded.into_records(SingleItem::Reject),
            vec![json!({"id": 1}), json!({"id": 2})]
        );
    }

    #[test]
    fn test_extracted_flattens_recovered_arrays() {
        // Splicing leaves `[..] x [..,..]`, which is still invalid JSON.
        let decoded = decode_best_effort(r#"[{"id": 1}] x [{"id": 2}][{"id": 3}]"#).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Extracted);
        assert_eq!(
            decoded.into_records(SingleItem::Reject),
            vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]
        );
    }

    #[test]
    fn test_nothing_recoverable() {
        let err = decode_best_effort("not json at all").unwrap_err();
        assert!(err.to_string().contains("no JSON could be recovered"));

        assert!(decode_best_effort("").is_err());
    }

    #[test]
    fn test_into_records_items_wrapper() {
        let decoded = Decoded {
            value: json!({"items": [{"id": 1}, 5, "x", {"id": 2}]}),
            strategy: DecodeStrategy::Direct,
        };
        assert_eq!(
            decoded.into_records(SingleItem::Reject),
            vec![json!({"id": 1}), json!({"id": 2})]
        );
    }

    #[test]
    fn test_into_records_single_item_object() {
        let decoded = Decoded {
            value: json!({"items": {"id": 9}}),
            strategy: DecodeStrategy::Direct,
        };
        assert_eq!(decoded.clone().into_records(SingleItem::Wrap), vec![json!({"id": 9})]);
        assert!(decoded.into_records(SingleItem::Reject).is_empty());
    }

    #[test]
    fn test_into_records_other_shapes_are_empty() {
        for value in [json!({"id": 1}), json!(42), json!("text"), json!({"items": 3})] {
            let decoded = Decoded {
                value,
                strategy: DecodeStrategy::Direct,
            };
            assert!(decoded.into_records(SingleItem::Reject).is_empty());
        }
    }

    #[test]
    fn test_direct_nested_arrays_are_not_flattened() {
        let decoded = decode_best_effort(r#"[[{"id": 1}]]"#).unwrap();
        assert!(decoded.into_records(SingleItem::Reject).is_empty());
    }

    #[test]
    fn test_read_export_strips_bom_and_tolerates_bad_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clientes.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\xEF\xBB\xBF[{\"nome\": \"a\xFFb\"}]").unwrap();

        let text = read_export(&path).unwrap();
        assert!(text.starts_with('['));
        let decoded = decode_best_effort(&text).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Direct);
    }

    #[test]
    fn test_read_export_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_export(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ReportError::FileRead { .. }));
    }
}
