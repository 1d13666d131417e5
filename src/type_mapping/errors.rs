use thiserror::Error;

/// Two operand mappings cannot be reconciled for an operator.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot unify type mapping `{left}` with `{right}`")]
pub struct TypeMappingConflict {
    pub left: String,
    pub right: String,
}

impl TypeMappingConflict {
    pub fn new(left: impl ToString, right: impl ToString) -> Self {
        TypeMappingConflict {
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeMappingError {
    #[error("Invalid store type '{store_type}': {reason}")]
    InvalidStoreType { store_type: String, reason: String },

    #[error("No mapping registered for store type '{0}'")]
    UnknownStoreType(String),

    #[error(transparent)]
    Conflict(#[from] TypeMappingConflict),
}
