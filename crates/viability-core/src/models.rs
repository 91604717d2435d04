use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Month labels in calendar order, as shown in every report column header.
pub const MONTH_LABELS: [&str; 12] = [
    "01-Jan", "02-Fev", "03-Mar", "04-Abr", "05-Mai", "06-Jun", "07-Jul", "08-Ago", "09-Set",
    "10-Out", "11-Nov", "12-Dez",
];

/// Label for a 1-based month number; out-of-range months yield `"??"`.
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize))
        .copied()
        .unwrap_or("??")
}

/// Public vs private classification of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Public body (the default for anything unresolved).
    Public,
    /// Private company, flagged by the organisation sentinel id.
    Private,
}

impl Default for Category {
    fn default() -> Self {
        Category::Public
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Public => write!(f, "Public"),
            Category::Private => write!(f, "Private"),
        }
    }
}

/// Opaque identifier taken from an export (client, accreditee, organisation).
///
/// JSON strings are kept verbatim and JSON numbers in canonical textual form,
/// so `4`, `4.0` and `"4"` all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build an identifier from a raw JSON value.
    ///
    /// Returns `None` for falsy values (`null`, `false`, `0`, `""`) and for
    /// anything that is neither a string nor a number.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    (i != 0).then(|| Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    let f = n.as_f64()?;
                    if f == 0.0 {
                        None
                    } else if f.fract() == 0.0 && f.abs() < 9.0e15 {
                        Some(Self((f as i64).to_string()))
                    } else {
                        Some(Self(f.to_string()))
                    }
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the client registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub id: EntityId,
    pub category: Category,
    /// Upper-cased display name; may be empty.
    pub name: String,
}

/// Client registry keyed by identifier.
pub type ClientMap = HashMap<EntityId, ClientRecord>;

/// A transaction that survived normalisation.
///
/// Always carries a valid date and a strictly positive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Wall-clock timestamp of the transaction.
    pub date: NaiveDateTime,
    /// Gross value, strictly positive.
    pub value: f64,
    pub category: Category,
    pub client_name: String,
    pub client_id: Option<EntityId>,
    pub accreditee_id: Option<EntityId>,
    pub is_pix: bool,
    /// Administrative fee charged to the accreditee, in percent.
    pub admin_fee_pct: f64,
    pub year: i32,
    /// Calendar month, 1-based.
    pub month: u32,
}

impl NormalizedTransaction {
    /// Build a transaction, deriving `year` and `month` from `date`.
    ///
    /// Returns `None` when `value` is not strictly positive.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDateTime,
        value: f64,
        category: Category,
        client_name: String,
        client_id: Option<EntityId>,
        accreditee_id: Option<EntityId>,
        is_pix: bool,
        admin_fee_pct: f64,
    ) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(Self {
            date,
            value,
            category,
            client_name,
            client_id,
            accreditee_id,
            is_pix,
            admin_fee_pct,
            year: date.year(),
            month: date.month(),
        })
    }

    pub fn month_label(&self) -> &'static str {
        month_label(self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(month_label(1), "01-Jan");
        assert_eq!(month_label(3), "03-Mar");
        assert_eq!(month_label(12), "12-Dez");
        assert_eq!(month_label(0), "??");
        assert_eq!(month_label(13), "??");
    }

    #[test]
    fn test_category_default_is_public() {
        assert_eq!(Category::default(), Category::Public);
        assert_eq!(Category::Private.to_string(), "Private");
    }

    #[test]
    fn test_entity_id_from_json_numbers_and_strings() {
        assert_eq!(EntityId::from_json(&json!(4)), Some(EntityId::new("4")));
        assert_eq!(EntityId::from_json(&json!(4.0)), Some(EntityId::new("4")));
        assert_eq!(EntityId::from_json(&json!("4")), Some(EntityId::new("4")));
        assert_eq!(EntityId::from_json(&json!("abc")), Some(EntityId::new("abc")));
    }

    #[test]
    fn test_entity_id_from_json_falsy_is_none() {
        assert!(EntityId::from_json(&json!(null)).is_none());
        assert!(EntityId::from_json(&json!(0)).is_none());
        assert!(EntityId::from_json(&json!("")).is_none());
        assert!(EntityId::from_json(&json!(false)).is_none());
        assert!(EntityId::from_json(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_transaction_derives_year_and_month() {
        let tx = NormalizedTransaction::new(
            date(2024, 3, 5),
            150.0,
            Category::Private,
            "ACME".to_string(),
            Some(EntityId::new("1")),
            None,
            true,
            0.0,
        )
        .unwrap();
        assert_eq!(tx.year, 2024);
        assert_eq!(tx.month, 3);
        assert_eq!(tx.month_label(), "03-Mar");
    }

    #[test]
    fn test_transaction_rejects_non_positive_value() {
        for value in [0.0, -10.0, f64::NAN] {
            let tx = NormalizedTransaction::new(
                date(2024, 1, 1),
                value,
                Category::Public,
                String::new(),
                None,
                None,
                false,
                0.0,
            );
            assert!(tx.is_none(), "value {value} must be rejected");
        }
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = NormalizedTransaction::new(
            date(2024, 3, 5),
            150.0,
            Category::Private,
            "ACME".to_string(),
            Some(EntityId::new("1")),
            None,
            true,
            1.5,
        )
        .unwrap();

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["category"], json!("private"));
        assert_eq!(value["client_id"], json!("1"));
        assert_eq!(value["accreditee_id"], json!(null));
        assert_eq!(value["date"], json!("2024-03-05T00:00:00"));
        assert_eq!(value["month"], json!(3));

        let back: NormalizedTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, tx);
    }
}
