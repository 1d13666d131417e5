use thiserror::Error;

use crate::type_mapping::TypeMappingError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Failed to read model file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse model: {error}")]
    ConfigParseError { error: String },
    #[error("Model must contain at least one entity")]
    Empty,
    #[error("Duplicate entity `{entity}`")]
    DuplicateEntity { entity: String },
    #[error("Entity `{entity}` declares no primary key")]
    EmptyPrimaryKey { entity: String },
    #[error("Primary key of `{entity}` references unknown property `{property}`")]
    UnknownKeyProperty { entity: String, property: String },
    #[error("Navigation `{entity}.{navigation}` targets unknown entity `{target}`")]
    UnknownNavigationTarget {
        entity: String,
        navigation: String,
        target: String,
    },
    #[error("`{entity}.{name}` is declared both as a property and as a navigation")]
    AmbiguousMember { entity: String, name: String },
    #[error("Property `{entity}.{property}`: {source}")]
    InvalidStoreType {
        entity: String,
        property: String,
        source: TypeMappingError,
    },
}
