use thiserror::Error;

use crate::type_mapping::TypeMappingConflict;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    /// Expected outcome: the caller evaluates this fragment on the client.
    #[error("Could not translate `{fragment}`: {reason}")]
    Untranslatable { fragment: String, reason: String },

    #[error("Type mapping conflict in `{fragment}`: cannot combine `{left}` with `{right}`")]
    TypeMappingConflict {
        fragment: String,
        left: String,
        right: String,
    },

    /// Untranslatable where client evaluation is impossible (e.g. inside a subquery).
    #[error("Query shape not supported: `{fragment}` cannot be evaluated on the server ({reason})")]
    QueryShape { fragment: String, reason: String },
}

impl TranslationError {
    pub fn conflict(fragment: impl ToString, conflict: TypeMappingConflict) -> Self {
        TranslationError::TypeMappingConflict {
            fragment: fragment.to_string(),
            left: conflict.left,
            right: conflict.right,
        }
    }

    /// Fatal errors abort the whole query; non-fatal ones fall back to the client.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TranslationError::Untranslatable { .. })
    }

    pub fn fragment(&self) -> &str {
        match self {
            TranslationError::Untranslatable { fragment, .. }
            | TranslationError::TypeMappingConflict { fragment, .. }
            | TranslationError::QueryShape { fragment, .. } => fragment,
        }
    }
}
