//! The type coercion engine.
//!
//! [`cast`] interprets a wire value read from a row against an attribute's
//! [`DataType`]; [`uncast`] produces the wire value bound for a write. For
//! every representable value `cast(uncast(v)) == v`, with two documented
//! lossy cases:
//!
//! - timestamps are written with millisecond precision, finer fractions are
//!   truncated;
//! - [`DataType::Date`] drops the time of day.
//!
//! Coercion is best effort, not validation: input that matches no rule for
//! the attribute's type passes through unchanged.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use regex::Regex;

use crate::dialect::Dialect;
use crate::types::DataType;
use crate::value::{SqlValue, Value};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DATE_FORMAT: &str = "%Y-%m-%d";

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("Invalid numeric regex"));

static DATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(?:[ T]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("Invalid date regex")
});

/// Returns the current time at the precision timestamps are stored with.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Casts a wire value into the semantic value of an attribute of type
/// `data_type`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn cast(data_type: DataType, wire: SqlValue, dialect: &dyn Dialect) -> Value {
    match (data_type, wire) {
        (_, SqlValue::Null) => Value::Null,

        (DataType::Boolean, SqlValue::Bool(b)) => Value::Bool(b),
        (DataType::Boolean, SqlValue::Int(n)) if !dialect.capabilities().native_boolean => {
            Value::Bool(n != 0)
        }
        (DataType::Boolean, SqlValue::Text(s)) => match s.as_str() {
            "1" | "true" | "TRUE" | "t" => Value::Bool(true),
            "0" | "false" | "FALSE" | "f" => Value::Bool(false),
            _ => Value::Text(s),
        },

        (t, SqlValue::Int(n)) if t.is_integer() => Value::Int(n),
        (t, SqlValue::Bool(b)) if t.is_integer() => Value::Int(i64::from(b)),
        (t, SqlValue::Float(f)) if t.is_integer() && f.fract() == 0.0 => Value::Int(f as i64),
        (t, SqlValue::Text(s)) if t.is_integer() => match s.trim().parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(s),
        },

        (DataType::Float, SqlValue::Float(f)) => Value::Float(f),
        (DataType::Float, SqlValue::Int(n)) => Value::Float(n as f64),
        (DataType::Float, SqlValue::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::Text(s),
        },

        (t, SqlValue::Text(s)) if t.is_temporal() => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(s),
        },
        (t, SqlValue::Int(millis)) if t.is_temporal() => {
            DateTime::from_timestamp_millis(millis).map_or(Value::Int(millis), Value::Timestamp)
        }

        (DataType::Json, SqlValue::Text(s)) => match serde_json::from_str(&s) {
            Ok(doc) => Value::Json(doc),
            Err(_) => Value::Text(s),
        },
        (DataType::Json, SqlValue::Blob(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(doc) => Value::Json(doc),
            Err(_) => Value::Binary(bytes),
        },

        (DataType::Binary, SqlValue::Text(s)) => Value::Binary(s.into_bytes()),
        (DataType::String | DataType::Text, SqlValue::Blob(bytes)) => {
            String::from_utf8(bytes).map_or_else(|e| Value::Binary(e.into_bytes()), Value::Text)
        }

        (_, wire) => passthrough(wire),
    }
}

/// Uncasts a semantic value into the wire value bound for an attribute of
/// type `data_type`.
///
/// Text assigned to a JSON attribute is bound as-is when it parses as a JSON
/// document, otherwise it is serialized as a JSON string.
#[must_use]
pub fn uncast(data_type: DataType, value: &Value, dialect: &dyn Dialect) -> SqlValue {
    match (data_type, value) {
        (_, Value::Null) => SqlValue::Null,
        (DataType::Json, Value::Text(s)) => {
            if serde_json::from_str::<serde_json::Value>(s).is_ok() {
                SqlValue::Text(s.clone())
            } else {
                SqlValue::Text(serde_json::Value::String(s.clone()).to_string())
            }
        }
        (DataType::Json, other) => SqlValue::Text(other.to_json().to_string()),
        (DataType::Date, Value::Timestamp(ts)) => {
            SqlValue::Text(ts.format(DATE_FORMAT).to_string())
        }
        (DataType::Boolean, Value::Int(n)) => to_wire(&Value::Bool(*n != 0), dialect),
        (t, Value::Text(s)) if t.is_integer() => s
            .trim()
            .parse::<i64>()
            .map_or_else(|_| SqlValue::Text(s.clone()), SqlValue::Int),
        (_, other) => to_wire(other, dialect),
    }
}

/// Maps a value with no attribute behind it (raw condition parameters,
/// columns outside the registry) onto the wire.
#[must_use]
pub fn to_wire(value: &Value, dialect: &dyn Dialect) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => {
            if dialect.capabilities().native_boolean {
                SqlValue::Bool(*b)
            } else {
                SqlValue::Int(i64::from(*b))
            }
        }
        Value::Int(n) => SqlValue::Int(*n),
        Value::Float(f) => SqlValue::Float(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Text(format_timestamp(ts)),
        Value::Json(doc) => SqlValue::Text(doc.to_string()),
        Value::Binary(bytes) => SqlValue::Blob(bytes.clone()),
    }
}

/// Types a value read from a column outside the registry by looking at it:
/// numeric strings become numbers, date-like strings become timestamps,
/// everything else is kept as is.
#[must_use]
pub fn guess(wire: SqlValue) -> Value {
    match wire {
        SqlValue::Text(s) => {
            if NUMERIC.is_match(&s) {
                if let Ok(n) = s.parse::<i64>() {
                    return Value::Int(n);
                }
                if let Ok(f) = s.parse::<f64>() {
                    return Value::Float(f);
                }
            }
            if DATE_LIKE.is_match(&s) {
                if let Some(ts) = parse_timestamp(&s) {
                    return Value::Timestamp(ts);
                }
            }
            Value::Text(s)
        }
        other => passthrough(other),
    }
}

/// Parses the timestamp shapes engines hand back: RFC 3339, `YYYY-MM-DD
/// HH:MM:SS[.fff]` (UTC assumed) and bare dates.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formats a timestamp the way it is written to every dialect.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

fn passthrough(wire: SqlValue) -> Value {
    match wire {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(b),
        SqlValue::Int(n) => Value::Int(n),
        SqlValue::Float(f) => Value::Float(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(bytes) => Value::Binary(bytes),
    }
}
