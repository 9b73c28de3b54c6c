//! Field values and records exchanged with the record store

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Identifier of a record inside one model's collection
pub type RecordId = u64;

/// Largest id a store may allocate; ids travel as JSON integers (`i64`)
pub const MAX_RECORD_ID: RecordId = i64::MAX as RecordId;

/// An ordered mapping of field name to value
pub type Record = IndexMap<String, FieldValue>;

/// A polymorphic field value as held by the record store
///
/// Temporal variants never leave the gateway as-is: the response formatter
/// rewrites them to [`FieldValue::String`] via [`FieldValue::normalized`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Check if the value is a date or datetime
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldValue::Date(_) | FieldValue::DateTime(_) | FieldValue::DateTimeUtc(_)
        )
    }

    /// Rewrite temporal values (recursively) to their ISO-8601 text form
    pub fn normalized(self) -> FieldValue {
        match self {
            FieldValue::Date(d) => FieldValue::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => FieldValue::String(iso_naive(&dt)),
            FieldValue::DateTimeUtc(dt) => {
                FieldValue::String(format!("{}+00:00", iso_naive(&dt.naive_utc())))
            }
            FieldValue::List(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::normalized).collect())
            }
            FieldValue::Map(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, v.normalized()))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Seconds precision, microseconds only when present
fn iso_naive(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Ids above [`MAX_RECORD_ID`] saturate; stores never allocate them
impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_date_normalizes_to_iso() {
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(value.normalized(), FieldValue::String("2024-03-09".into()));
    }

    #[test]
    fn test_datetime_without_fraction() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(
            FieldValue::DateTime(dt).normalized(),
            FieldValue::String("2024-03-09T14:05:00".into())
        );
    }

    #[test]
    fn test_datetime_with_microseconds() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(14, 5, 0, 1234)
            .unwrap();
        assert_eq!(
            FieldValue::DateTime(dt).normalized(),
            FieldValue::String("2024-03-09T14:05:00.001234".into())
        );
    }

    #[test]
    fn test_utc_datetime_keeps_offset() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            FieldValue::DateTimeUtc(dt).normalized(),
            FieldValue::String("2024-01-02T03:04:05+00:00".into())
        );

        let fractional = dt + chrono::Duration::milliseconds(500);
        assert_eq!(
            FieldValue::DateTimeUtc(fractional).normalized(),
            FieldValue::String("2024-01-02T03:04:05.500000+00:00".into())
        );

        let naive = fractional.naive_utc();
        assert_eq!(
            FieldValue::DateTime(naive).normalized(),
            FieldValue::String("2024-01-02T03:04:05.500000".into())
        );
    }

    #[test]
    fn test_record_id_conversion_saturates() {
        assert_eq!(FieldValue::from(42u64), FieldValue::Integer(42));
        assert_eq!(FieldValue::from(MAX_RECORD_ID), FieldValue::Integer(i64::MAX));
        assert_eq!(FieldValue::from(u64::MAX), FieldValue::Integer(i64::MAX));
    }

    #[test]
    fn test_nested_values_are_normalized() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let mut inner = IndexMap::new();
        inner.insert("when".to_string(), date.clone());
        let value = FieldValue::List(vec![date, FieldValue::Map(inner)]);

        let json = serde_json::to_value(value.normalized()).unwrap();
        assert_eq!(json, json!(["2020-01-01", {"when": "2020-01-01"}]));
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(FieldValue::from(json!(3)), FieldValue::Integer(3));
        assert_eq!(FieldValue::from(json!(2.5)), FieldValue::Float(2.5));
        assert!(FieldValue::from(json!(null)).is_null());
    }

    #[test]
    fn test_scalar_serialization_is_plain_json() {
        assert_eq!(serde_json::to_value(FieldValue::Integer(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(FieldValue::String("x".into())).unwrap(),
            json!("x")
        );
        assert_eq!(serde_json::to_value(FieldValue::Null).unwrap(), json!(null));
    }
}
