//! Semantic and wire values.
//!
//! A [`SqlValue`] is what travels to and from a driver: the handful of
//! scalar shapes every engine can bind. A [`Value`] is what a model instance
//! holds once the coercion engine has interpreted a wire value against the
//! attribute's [`DataType`](crate::DataType): timestamps are structured,
//! JSON columns are documents, booleans are booleans even on engines that
//! store them as `0`/`1`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

/// A SQL value that can be used as a bound parameter or read back from a row.
///
/// Values are always bound, never interpolated into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value, only produced for dialects with a native boolean.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The semantic value of an attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Loaded or assigned as null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
    /// A point in time, always UTC.
    Timestamp(DateTime<Utc>),
    /// A structured JSON document.
    Json(serde_json::Value),
    /// Raw bytes.
    Binary(Vec<u8>),
}

/// Attribute name to value, the shape of every snapshot and write payload.
pub type Values = BTreeMap<String, Value>;

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an integer value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a float for integer and float values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a timestamp value.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Returns the JSON document, if this is a JSON value.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the JSON document mutably, for in-place edits.
    pub fn as_json_mut(&mut self) -> Option<&mut serde_json::Value> {
        match self {
            Self::Json(doc) => Some(doc),
            _ => None,
        }
    }

    /// Renders the value as plain JSON, the way it is exposed by
    /// `to_json()`/`to_object()` on instances.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Json(doc) => doc.clone(),
            Self::Binary(bytes) => serde_json::Value::from(bytes.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<serde_json::Value> for Value {
    fn from(doc: serde_json::Value) -> Self {
        Self::Json(doc)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

/// `None` stands for an absent value and is stored as null.
impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Builds a [`Values`] map.
///
/// ```rust
/// use spellbook_core::{values, Value};
///
/// let row = values! { "title" => "New Post", "wordCount" => 3 };
/// assert_eq!(row["wordCount"], Value::Int(3));
/// ```
#[macro_export]
macro_rules! values {
    () => {
        $crate::Values::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Values::new();
        $(map.insert(::std::string::String::from($name), $crate::Value::from($value));)+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_option_normalizes_to_null() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(3).as_i64(), Some(3));
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("a").as_str(), Some("a"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert!(Value::from("a").as_i64().is_none());
    }

    #[test]
    fn test_json_in_place_edit() {
        let mut value = Value::from(json!({ "versions": [2] }));
        value.as_json_mut().unwrap()["foo"] = json!("bar");
        assert_eq!(value, Value::from(json!({ "versions": [2], "foo": "bar" })));
    }

    #[test]
    fn test_to_json() {
        let ts = Utc.with_ymd_and_hms(2012, 2, 12, 19, 19, 19).unwrap();
        assert_eq!(
            Value::from(ts).to_json(),
            json!("2012-02-12T19:19:19.000Z")
        );
        assert_eq!(Value::from(vec![1u8, 2]).to_json(), json!([1, 2]));
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_values_macro() {
        let row = values! { "title" => "Leah", "isPrivate" => false };
        assert_eq!(row.len(), 2);
        assert_eq!(row["isPrivate"], Value::Bool(false));
        let empty: Values = values! {};
        assert!(empty.is_empty());
    }
}
