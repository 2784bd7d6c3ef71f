//! Semantic data types of attributes.

use std::fmt;

/// The semantic type of an attribute, driving how values are cast from and
/// uncast to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Short text (`VARCHAR`).
    String,
    /// Long text (`TEXT`).
    Text,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Floating point number.
    Float,
    /// Boolean, stored as `0`/`1` on engines without a native type.
    Boolean,
    /// Calendar date without time of day.
    Date,
    /// Date and time, kept with millisecond precision.
    DateTime,
    /// JSON document, stored as text.
    Json,
    /// Raw bytes.
    Binary,
}

impl DataType {
    /// Returns true for the types that hold a point in time.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    /// Returns true for the integer types.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Integer | Self::BigInt)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "STRING",
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
            Self::Json => "JSON",
            Self::Binary => "BINARY",
        };
        f.write_str(name)
    }
}
