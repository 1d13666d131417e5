//! Constant values carried by both expression trees.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::type_mapping::ScalarKind;

/// A constant value as it appears in a query expression or SQL literal.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Date(NaiveDate),
    Guid(Uuid),
    /// Inline collection, only meaningful as the source of an IN list.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Scalar kind implied by the value itself. `Null` and lists carry no kind.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Bool(_) => Some(ScalarKind::Bool),
            Value::Int(_) => Some(ScalarKind::Int64),
            Value::Double(_) => Some(ScalarKind::Double),
            Value::String(_) => Some(ScalarKind::String),
            Value::Bytes(_) => Some(ScalarKind::Bytes),
            Value::DateTime(_) => Some(ScalarKind::DateTime),
            Value::DateTimeOffset(_) => Some(ScalarKind::DateTimeOffset),
            Value::Date(_) => Some(ScalarKind::Date),
            Value::Guid(_) => Some(ScalarKind::Guid),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::DateTimeOffset(dt) => write!(f, "{}", dt),
            Value::Date(d) => write!(f, "{}", d),
            Value::Guid(g) => write!(f, "{}", g),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}
