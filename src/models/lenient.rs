//! Forgiving field deserializers for the record builder.
//!
//! A cell that survived the value parser as raw text (a malformed token) must
//! not abort the whole record. These helpers turn such values into `None` and
//! log them, so only structurally required fields can fail validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, de::Error};
use serde_json::Value;
use tracing::warn;

pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::Null => None,
        other => {
            warn!("Dropping non-numeric value {} for a decimal field", other);
            None
        }
    }))
}

/// Integral floats are accepted: negative amounts arrive as floats because
/// the leading sign defeats the digits-only integer rule.
pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::Null => None,
        other => {
            warn!("Dropping non-integer value {} for an integer field", other);
            None
        }
    }))
}

pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Accepts the ISO strings emitted by the value parser (`2025-05-02T00:00:00Z`)
/// as well as bare `YYYY-MM-DD` dates.
pub fn opt_datetime<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::String(s) => parse_datetime(&s).or_else(|| {
            warn!("Dropping unparseable date {:?}", s);
            None
        }),
        _ => None,
    }))
}

/// Required text field; numbers are tolerated and rendered as text.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected text, found {other}"))),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
