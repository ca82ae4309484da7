//! Lenient timestamp coercion for values read out of documents.
//!
//! Backing stores hand timestamps back in several shapes: a native
//! `{seconds, nanos}` object, an RFC 3339 string, or a bare epoch number.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Epoch numbers above this are taken to be milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Membership timestamps: numbers are always epoch seconds.
#[must_use]
pub fn from_store_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch_seconds),
        other => from_native_or_text(other),
    }
}

/// Document timestamps: numbers may be seconds or milliseconds.
#[must_use]
pub fn from_document_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if raw > MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(raw as i64)
            } else {
                from_epoch_seconds(raw)
            }
        }
        other => from_native_or_text(other),
    }
}

/// Parses RFC 3339, falling back to SQLite's `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn from_native_or_text(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_text(s),
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanos")
                .or_else(|| map.get("nanoseconds"))
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_store_value_shapes() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(from_store_value(&json!(1_700_000_000)), Some(expected));
        assert_eq!(
            from_store_value(&json!({"seconds": 1_700_000_000, "nanos": 0})),
            Some(expected)
        );
        assert_eq!(
            from_store_value(&json!("2023-11-14T22:13:20Z")),
            Some(expected)
        );
        assert_eq!(from_store_value(&json!("2023-11-14 22:13:20")), Some(expected));
    }

    #[test]
    fn test_unparsable_values_are_none() {
        assert_eq!(from_store_value(&json!("yesterday")), None);
        assert_eq!(from_store_value(&json!(true)), None);
        assert_eq!(from_store_value(&Value::Null), None);
        assert_eq!(from_store_value(&json!({"when": 1})), None);
    }

    #[test]
    fn test_document_value_detects_millis() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(from_document_value(&json!(1_700_000_000_000_i64)), Some(expected));
        assert_eq!(from_document_value(&json!(1_700_000_000)), Some(expected));
    }
}
