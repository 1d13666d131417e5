//! Type mappings between semantic value kinds and backend storage types
//!
//! A [`TypeMapping`] describes how a value of a given [`ScalarKind`] is stored
//! by the backend: the store type name, its affinity, optional size facets and
//! collation, and how literals of that type are written into SQL text.
//!
//! # Supported kinds
//!
//! - `bool` - booleans (generic: `boolean`, SQLite: `INTEGER`)
//! - `int16` / `int32` / `int64` - whole numbers
//! - `double` / `decimal` - fractional numbers
//! - `string` - text, optionally sized and collated
//! - `bytes` - binary blobs
//! - `date_time` / `date_time_offset` / `date` / `time_span` - temporal values
//! - `guid` - UUIDs
//!
//! The registry ([`TypeMappingSource`]) is built once and shared read-only by
//! every translation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

pub mod errors;
pub mod registry;
mod store_type;

pub use errors::{TypeMappingConflict, TypeMappingError};
pub use registry::{RelationalTypeMappingSource, TypeMappingSource};
pub use store_type::{parse_store_type, StoreTypeName};

/// Semantic value kind, independent of any backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    Bytes,
    DateTime,
    DateTimeOffset,
    Date,
    TimeSpan,
    Guid,
}

impl ScalarKind {
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ScalarKind::DateTime | ScalarKind::DateTimeOffset | ScalarKind::Date
        )
    }

    /// Reference kinds can always hold null in the source language.
    pub fn is_reference(self) -> bool {
        matches!(self, ScalarKind::String | ScalarKind::Bytes)
    }

    /// Widening order used when two numeric mappings meet.
    pub(crate) fn numeric_rank(self) -> Option<u8> {
        match self {
            ScalarKind::Int16 => Some(1),
            ScalarKind::Int32 => Some(2),
            ScalarKind::Int64 => Some(3),
            ScalarKind::Decimal => Some(4),
            ScalarKind::Double => Some(5),
            _ => None,
        }
    }

    /// Parse a kind name from model configuration.
    ///
    /// Case-insensitive, accepts a few common aliases (`int`, `text`, `uuid`, ...).
    pub fn from_name(s: &str) -> Result<Self, String> {
        match s.to_lowercase().trim() {
            "bool" | "boolean" => Ok(ScalarKind::Bool),
            "int16" | "short" | "smallint" => Ok(ScalarKind::Int16),
            "int32" | "int" | "integer" => Ok(ScalarKind::Int32),
            "int64" | "long" | "bigint" => Ok(ScalarKind::Int64),
            "double" | "float" => Ok(ScalarKind::Double),
            "decimal" | "numeric" => Ok(ScalarKind::Decimal),
            "string" | "text" => Ok(ScalarKind::String),
            "bytes" | "binary" | "blob" => Ok(ScalarKind::Bytes),
            "date_time" | "datetime" | "timestamp" => Ok(ScalarKind::DateTime),
            "date_time_offset" | "datetimeoffset" | "timestamptz" => {
                Ok(ScalarKind::DateTimeOffset)
            }
            "date" => Ok(ScalarKind::Date),
            "time_span" | "timespan" | "interval" => Ok(ScalarKind::TimeSpan),
            "guid" | "uuid" => Ok(ScalarKind::Guid),
            _ => Err(format!(
                "Unknown kind: '{}'. Supported: bool, int16, int32, int64, double, decimal, \
                 string, bytes, date_time, date_time_offset, date, time_span, guid",
                s
            )),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "Bool",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Double => "Double",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::String => "String",
            ScalarKind::Bytes => "Bytes",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::DateTimeOffset => "DateTimeOffset",
            ScalarKind::Date => "Date",
            ScalarKind::TimeSpan => "TimeSpan",
            ScalarKind::Guid => "Guid",
        };
        f.write_str(name)
    }
}

/// Storage affinity of a mapping, drives literal formatting and unification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAffinity {
    Integer,
    Real,
    Numeric,
    Text,
    Blob,
    Boolean,
    Temporal,
}

/// Association between a semantic kind and its backend storage representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Store type as written in DDL and CAST expressions (e.g. `varchar(256)`)
    pub store_type: String,
    pub kind: ScalarKind,
    pub affinity: StoreAffinity,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub collation: Option<String>,
}

impl TypeMapping {
    pub fn new(store_type: impl Into<String>, kind: ScalarKind, affinity: StoreAffinity) -> Self {
        TypeMapping {
            store_type: store_type.into(),
            kind,
            affinity,
            size: None,
            scale: None,
            collation: None,
        }
    }

    pub fn with_store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = store_type.into();
        self
    }

    pub fn with_size(mut self, size: Option<u32>, scale: Option<u32>) -> Self {
        self.size = size;
        self.scale = scale;
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// A mapping is more specific when it carries facets the other lacks.
    pub fn is_more_specific_than(&self, other: &TypeMapping) -> bool {
        let facets = |m: &TypeMapping| {
            m.size.is_some() as u8 + m.scale.is_some() as u8 + m.collation.is_some() as u8
        };
        match facets(self).cmp(&facets(other)) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.size.unwrap_or(0) > other.size.unwrap_or(0),
        }
    }

    /// Write a value as a SQL literal of this mapping.
    pub fn generate_sql_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self.affinity {
                StoreAffinity::Boolean => if *b { "TRUE" } else { "FALSE" }.to_string(),
                _ => if *b { "1" } else { "0" }.to_string(),
            },
            Value::Int(i) => match self.affinity {
                StoreAffinity::Real => format!("{}.0", i),
                _ => i.to_string(),
            },
            Value::Double(d) => {
                let text = d.to_string();
                if d.is_finite() && !text.contains(['.', 'e', 'E']) {
                    format!("{}.0", text)
                } else {
                    text
                }
            }
            Value::String(s) => quote_text(s),
            Value::Bytes(bytes) => format!("X'{}'", hex::encode_upper(bytes)),
            Value::DateTime(dt) => quote_text(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::DateTimeOffset(dt) => {
                quote_text(&dt.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string())
            }
            Value::Date(d) => quote_text(&d.format("%Y-%m-%d").to_string()),
            Value::Guid(g) => quote_text(&g.hyphenated().to_string()),
            Value::List(items) => {
                let items: Vec<String> =
                    items.iter().map(|v| self.generate_sql_literal(v)).collect();
                format!("({})", items.join(", "))
            }
        }
    }
}

impl fmt::Display for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.store_type, self.kind)?;
        if let Some(collation) = &self.collation {
            write!(f, " COLLATE {}", collation)?;
        }
        Ok(())
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
