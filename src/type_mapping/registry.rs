//! Type mapping registry
//!
//! [`TypeMappingSource`] is the lookup contract the rest of the crate relies on.
//! [`RelationalTypeMappingSource`] is the default registry with per-dialect
//! store types.

use std::collections::HashMap;

use super::errors::{TypeMappingConflict, TypeMappingError};
use super::store_type::parse_store_type;
use super::{ScalarKind, StoreAffinity, TypeMapping};
use crate::config::SqlDialect;

/// Registry of type mappings, shared read-only across translations.
pub trait TypeMappingSource: Send + Sync {
    /// Default mapping for a kind, if the registry knows one.
    fn find_mapping(&self, kind: ScalarKind) -> Option<TypeMapping>;

    /// Mapping for a store type string such as `varchar(256)`.
    fn find_mapping_for_store_type(&self, store_type: &str)
        -> Result<TypeMapping, TypeMappingError>;

    /// Default mapping for a kind, synthesizing one when none is registered.
    fn mapping_for(&self, kind: ScalarKind) -> TypeMapping {
        self.find_mapping(kind).unwrap_or_else(|| {
            TypeMapping::new(kind.to_string().to_lowercase(), kind, default_affinity(kind))
        })
    }

    /// Reconcile two operand mappings.
    fn unify(
        &self,
        left: &TypeMapping,
        right: &TypeMapping,
    ) -> Result<TypeMapping, TypeMappingConflict> {
        unify_mappings(left, right)
    }
}

fn default_affinity(kind: ScalarKind) -> StoreAffinity {
    match kind {
        ScalarKind::Bool => StoreAffinity::Boolean,
        ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64 => StoreAffinity::Integer,
        ScalarKind::Double => StoreAffinity::Real,
        ScalarKind::Decimal => StoreAffinity::Numeric,
        ScalarKind::String | ScalarKind::Guid => StoreAffinity::Text,
        ScalarKind::Bytes => StoreAffinity::Blob,
        ScalarKind::DateTime
        | ScalarKind::DateTimeOffset
        | ScalarKind::Date
        | ScalarKind::TimeSpan => StoreAffinity::Temporal,
    }
}

/// Unification rules shared by every registry:
/// - identical mappings unify to themselves
/// - numeric kinds widen (Int16 < Int32 < Int64 < Decimal < Double)
/// - same non-numeric kinds keep the more specific mapping, unless both carry
///   different collations
/// - anything else conflicts
pub fn unify_mappings(
    left: &TypeMapping,
    right: &TypeMapping,
) -> Result<TypeMapping, TypeMappingConflict> {
    if left == right {
        return Ok(left.clone());
    }

    match (left.kind.numeric_rank(), right.kind.numeric_rank()) {
        (Some(l), Some(r)) if l != r => {
            return Ok(if r > l { right.clone() } else { left.clone() });
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(TypeMappingConflict::new(left, right));
        }
        _ => {}
    }

    if left.kind != right.kind {
        return Err(TypeMappingConflict::new(left, right));
    }

    if let (Some(a), Some(b)) = (&left.collation, &right.collation) {
        if !a.eq_ignore_ascii_case(b) {
            return Err(TypeMappingConflict::new(left, right));
        }
    }

    let (chosen, other) = if right.is_more_specific_than(left) {
        (right, left)
    } else {
        (left, right)
    };
    let mut unified = chosen.clone();
    if unified.collation.is_none() {
        unified.collation = other.collation.clone();
    }
    Ok(unified)
}

/// Default registry with generic or SQLite store types.
#[derive(Debug, Clone)]
pub struct RelationalTypeMappingSource {
    dialect: SqlDialect,
    mappings: HashMap<ScalarKind, TypeMapping>,
}

impl Default for RelationalTypeMappingSource {
    fn default() -> Self {
        Self::for_dialect(SqlDialect::Generic)
    }
}

impl RelationalTypeMappingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_dialect(dialect: SqlDialect) -> Self {
        use ScalarKind::*;
        use StoreAffinity as A;

        let table: &[(ScalarKind, &str, StoreAffinity)] = match dialect {
            SqlDialect::Generic => &[
                (Bool, "boolean", A::Boolean),
                (Int16, "smallint", A::Integer),
                (Int32, "integer", A::Integer),
                (Int64, "bigint", A::Integer),
                (Double, "double precision", A::Real),
                (Decimal, "decimal", A::Numeric),
                (String, "text", A::Text),
                (Bytes, "blob", A::Blob),
                (DateTime, "timestamp", A::Temporal),
                (DateTimeOffset, "timestamptz", A::Temporal),
                (Date, "date", A::Temporal),
                (TimeSpan, "interval", A::Temporal),
                (Guid, "uuid", A::Text),
            ],
            SqlDialect::Sqlite => &[
                (Bool, "INTEGER", A::Integer),
                (Int16, "INTEGER", A::Integer),
                (Int32, "INTEGER", A::Integer),
                (Int64, "INTEGER", A::Integer),
                (Double, "REAL", A::Real),
                (Decimal, "TEXT", A::Numeric),
                (String, "TEXT", A::Text),
                (Bytes, "BLOB", A::Blob),
                (DateTime, "TEXT", A::Temporal),
                (DateTimeOffset, "TEXT", A::Temporal),
                (Date, "TEXT", A::Temporal),
                (TimeSpan, "TEXT", A::Temporal),
                (Guid, "TEXT", A::Text),
            ],
        };

        let mappings = table
            .iter()
            .map(|(kind, store, affinity)| (*kind, TypeMapping::new(*store, *kind, *affinity)))
            .collect();

        RelationalTypeMappingSource { dialect, mappings }
    }

    /// Replace the default mapping for a kind.
    pub fn with_mapping(mut self, mapping: TypeMapping) -> Self {
        self.mappings.insert(mapping.kind, mapping);
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn kind_for_store_base(&self, base: &str) -> Option<ScalarKind> {
        let kind = match base {
            "boolean" | "bool" | "bit" => ScalarKind::Bool,
            "smallint" | "int2" => ScalarKind::Int16,
            "integer" if self.dialect == SqlDialect::Sqlite => ScalarKind::Int64,
            "int" | "integer" | "int4" => ScalarKind::Int32,
            "bigint" | "int8" => ScalarKind::Int64,
            "real" | "float" | "float8" | "double" | "double precision" => ScalarKind::Double,
            "decimal" | "numeric" | "money" => ScalarKind::Decimal,
            "text" | "varchar" | "nvarchar" | "char" | "nchar" | "character varying" | "clob" => {
                ScalarKind::String
            }
            "blob" | "bytea" | "binary" | "varbinary" => ScalarKind::Bytes,
            "timestamp" | "datetime" | "datetime2" => ScalarKind::DateTime,
            "timestamptz" | "datetimeoffset" | "timestamp with time zone" => {
                ScalarKind::DateTimeOffset
            }
            "date" => ScalarKind::Date,
            "interval" | "time" => ScalarKind::TimeSpan,
            "uuid" | "uniqueidentifier" => ScalarKind::Guid,
            _ => return None,
        };
        Some(kind)
    }
}

impl TypeMappingSource for RelationalTypeMappingSource {
    fn find_mapping(&self, kind: ScalarKind) -> Option<TypeMapping> {
        self.mappings.get(&kind).cloned()
    }

    fn find_mapping_for_store_type(
        &self,
        store_type: &str,
    ) -> Result<TypeMapping, TypeMappingError> {
        let parsed = parse_store_type(store_type)?;
        let kind = self
            .kind_for_store_base(&parsed.base)
            .ok_or_else(|| TypeMappingError::UnknownStoreType(store_type.to_string()))?;

        Ok(self
            .mapping_for(kind)
            .with_store_type(store_type.trim())
            .with_size(parsed.size, parsed.scale))
    }
}
