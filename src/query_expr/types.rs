use serde::{Deserialize, Serialize};
use std::fmt;

use crate::type_mapping::ScalarKind;

/// Shape of a source-language value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar(ScalarKind),
    /// Instance of a mapped entity type
    Entity(String),
    Collection(Box<ValueKind>),
}

/// Source-language type of an expression node.
///
/// `nullable` follows source semantics: strings, byte arrays and entities are
/// reference types and always nullable; value types are nullable only when
/// wrapped (`int?`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprType {
    pub kind: ValueKind,
    pub nullable: bool,
}

impl ExprType {
    /// Scalar type with the default nullability of its kind.
    pub fn scalar(kind: ScalarKind) -> Self {
        ExprType {
            kind: ValueKind::Scalar(kind),
            nullable: kind.is_reference(),
        }
    }

    /// Wrapped value type such as `int?`.
    pub fn nullable(kind: ScalarKind) -> Self {
        ExprType {
            kind: ValueKind::Scalar(kind),
            nullable: true,
        }
    }

    pub fn entity(entity_type: impl Into<String>) -> Self {
        ExprType {
            kind: ValueKind::Entity(entity_type.into()),
            nullable: true,
        }
    }

    pub fn collection(element: ValueKind) -> Self {
        ExprType {
            kind: ValueKind::Collection(Box::new(element)),
            nullable: true,
        }
    }

    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.kind {
            ValueKind::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }

    /// Wrapped value type, as opposed to a reference type.
    pub fn is_nullable_value_type(&self) -> bool {
        match &self.kind {
            ValueKind::Scalar(kind) => self.nullable && !kind.is_reference(),
            _ => false,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Scalar(kind) => {
                write!(f, "{}", kind)?;
                if self.is_nullable_value_type() {
                    f.write_str("?")?;
                }
                Ok(())
            }
            ValueKind::Entity(name) => f.write_str(name),
            ValueKind::Collection(element) => {
                let inner = ExprType {
                    kind: (**element).clone(),
                    nullable: false,
                };
                write!(f, "IEnumerable<{}>", inner)
            }
        }
    }
}

/// Type that declares a member or method; the key translators match on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclaringType {
    Scalar(ScalarKind),
    /// `Nullable<T>` wrapper members (`HasValue`, `Value`, `GetValueOrDefault`)
    Nullable(ScalarKind),
    Entity(String),
    /// Instance collections (`List<T>.Contains`)
    Collection,
    Math,
    Convert,
    /// Static sequence helpers (`Enumerable.Contains`)
    Enumerable,
}

impl fmt::Display for DeclaringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaringType::Scalar(kind) => write!(f, "{}", kind),
            DeclaringType::Nullable(kind) => write!(f, "Nullable<{}>", kind),
            DeclaringType::Entity(name) => f.write_str(name),
            DeclaringType::Collection => f.write_str("List"),
            DeclaringType::Math => f.write_str("Math"),
            DeclaringType::Convert => f.write_str("Convert"),
            DeclaringType::Enumerable => f.write_str("Enumerable"),
        }
    }
}
