//! Tagged value union for statement parameters and row values
//!
//! This module provides the primitive forms a parameter is reduced to before
//! it is bound into a prepared statement.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A primitive SQL-bindable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL with the column's type, required so the driver knows which
    /// NULL to send
    Null(SqlType),
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

/// SQL type codes, used for typed NULL binding and null-aware decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Text,
    Blob,
    DateTime,
    TimestampTz,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// The SQL type this value binds as.
    pub fn type_of(&self) -> SqlType {
        match self {
            SqlValue::Null(ty) => *ty,
            SqlValue::Bool(_) => SqlType::Bool,
            SqlValue::SmallInt(_) => SqlType::SmallInt,
            SqlValue::Int(_) => SqlType::Int,
            SqlValue::BigInt(_) => SqlType::BigInt,
            SqlValue::Real(_) => SqlType::Real,
            SqlValue::Double(_) => SqlType::Double,
            SqlValue::Text(_) => SqlType::Text,
            SqlValue::Blob(_) => SqlType::Blob,
            SqlValue::DateTime(_) => SqlType::DateTime,
            SqlValue::TimestampTz(_) => SqlType::TimestampTz,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(val: bool) -> Self {
        SqlValue::Bool(val)
    }
}

impl From<i16> for SqlValue {
    fn from(val: i16) -> Self {
        SqlValue::SmallInt(val)
    }
}

impl From<i32> for SqlValue {
    fn from(val: i32) -> Self {
        SqlValue::Int(val)
    }
}

impl From<i64> for SqlValue {
    fn from(val: i64) -> Self {
        SqlValue::BigInt(val)
    }
}

impl From<f32> for SqlValue {
    fn from(val: f32) -> Self {
        SqlValue::Real(val)
    }
}

impl From<f64> for SqlValue {
    fn from(val: f64) -> Self {
        SqlValue::Double(val)
    }
}

impl From<String> for SqlValue {
    fn from(val: String) -> Self {
        SqlValue::Text(val)
    }
}

impl From<&str> for SqlValue {
    fn from(val: &str) -> Self {
        SqlValue::Text(val.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(val: Vec<u8>) -> Self {
        SqlValue::Blob(val)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(val: NaiveDateTime) -> Self {
        SqlValue::DateTime(val)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(val: DateTime<Utc>) -> Self {
        SqlValue::TimestampTz(val)
    }
}
