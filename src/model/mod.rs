//! Entity model metadata consumed by the translator
//!
//! The translator only needs to map `(entity type, property)` to a column,
//! `(entity type, navigation)` to a related entity, and an entity type to its
//! key. [`ModelMetadata`] is that contract; [`StaticModel`] is a YAML-backed
//! implementation used by the CLI and the test suites.

use serde::{Deserialize, Serialize};

use crate::type_mapping::TypeMapping;

pub mod errors;
pub mod static_model;

pub use errors::ModelError;
pub use static_model::{
    EntityDefinition, KeyDefinition, ModelConfig, NavigationDefinition, PropertyDefinition,
    StaticModel,
};

/// Column a mapped property is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub column: String,
    pub type_mapping: TypeMapping,
    pub nullable: bool,
}

/// Reference from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationBinding {
    pub target_entity: String,
    /// An optional navigation may have no related row; its columns become nullable.
    pub optional: bool,
}

/// Join the surrounding pipeline must add for a navigation the translator walked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinRequest {
    pub source_alias: String,
    pub navigation: String,
    pub target_entity: String,
    pub alias: String,
    pub optional: bool,
}

/// Read-only access to the mapped entity model.
#[cfg_attr(test, mockall::automock)]
pub trait ModelMetadata: Send + Sync {
    fn resolve_column(&self, entity_type: &str, property: &str) -> Option<ColumnBinding>;

    fn resolve_navigation(&self, entity_type: &str, navigation: &str)
        -> Option<NavigationBinding>;

    /// Key property names, in declaration order.
    fn primary_key(&self, entity_type: &str) -> Vec<String>;
}

/// Table alias given to the target of a navigation, e.g. `u_profile`.
pub fn navigation_alias(source_alias: &str, navigation: &str) -> String {
    format!("{}_{}", source_alias, navigation.to_lowercase())
}
