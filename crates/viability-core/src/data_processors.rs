use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

// ── Truthiness ────────────────────────────────────────────────────────────────

/// `true` when a JSON value carries usable data.
///
/// Export files use `null`, `false`, `0`, `""` and empty containers
/// interchangeably for "not filled in"; all of them count as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ── Accessor / Field ──────────────────────────────────────────────────────────

/// One way of reaching a value inside a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// A top-level key.
    Key(&'static str),
    /// A key inside an embedded object, e.g. `cliente.id`.
    Nested(&'static str, &'static str),
}

impl Accessor {
    /// Resolve the accessor against `data`. Nested lookups require the outer
    /// value to be an object.
    pub fn get<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        match *self {
            Accessor::Key(key) => data.get(key),
            Accessor::Nested(outer, inner) => data.get(outer)?.as_object()?.get(inner),
        }
    }
}

/// A logical record field and the ordered accessors that may hold it.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub accessors: &'static [Accessor],
}

impl Field {
    pub const fn new(name: &'static str, accessors: &'static [Accessor]) -> Self {
        Self { name, accessors }
    }

    /// First accessor whose value is present (see [`is_present`]).
    pub fn first_present<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        self.accessors
            .iter()
            .filter_map(|accessor| accessor.get(data))
            .find(|value| is_present(value))
    }

    /// The field coerced to a number; absent or non-numeric yields `0.0`.
    pub fn number_or_zero(&self, data: &Value) -> f64 {
        self.first_present(data)
            .and_then(NumberCoercer::coerce)
            .unwrap_or(0.0)
    }

    /// The field as an upper-cased string, if it is a non-empty string.
    pub fn upper_string(&self, data: &Value) -> Option<String> {
        self.first_present(data)
            .and_then(|v| v.as_str())
            .map(|s| s.to_uppercase())
    }
}

// ── NumberCoercer ─────────────────────────────────────────────────────────────

/// Converts loosely-typed JSON values into `f64`.
pub struct NumberCoercer;

impl NumberCoercer {
    /// JSON numbers are taken as-is; strings are trimmed and parsed, accepting
    /// a decimal comma when no dot is present (`"150,50"`). Everything else,
    /// including non-finite results, yields `None`.
    pub fn coerce(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Self::parse_str(s),
            _ => None,
        }?;
        parsed.is_finite().then_some(parsed)
    }

    fn parse_str(s: &str) -> Option<f64> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Some(v);
        }
        if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
            return trimmed.replace(',', ".").parse::<f64>().ok();
        }
        None
    }
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses transaction dates from the variety of formats found in exports.
///
/// Timestamps keep the wall-clock time of their source; an explicit offset is
/// honoured for parsing but not converted away.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a [`NaiveDateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → RFC 3339 or one of the common patterns below.
    /// * JSON number  → Unix timestamp in seconds.
    pub fn parse(value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(n) => {
                let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
                DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
            }
            _ => None,
        }
    }

    fn parse_str(s: &str) -> Option<NaiveDateTime> {
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_local());
        }

        const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.naive_local());
            }
        }

        // Slashed dates are day-first (05/03/2024 is 5 March).
        const DATETIME_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
            "%d/%m/%Y %H:%M:%S",
            "%d/%m/%Y %H:%M",
        ];
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }

        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        debug!("TimestampProcessor: could not parse date string \"{}\"", s);
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
