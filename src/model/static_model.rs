//! YAML-backed entity model.
//!
//! ```yaml
//! entities:
//!   - name: User
//!     table: AspNetUsers
//!     primary_key: Id
//!     properties:
//!       Id: { store_type: "nvarchar(450)" }
//!       Email: { column: email, store_type: "nvarchar(256)", nullable: true }
//!     navigations:
//!       Profile: { target: Profile, optional: true }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::errors::ModelError;
use super::{ColumnBinding, ModelMetadata, NavigationBinding};
use crate::type_mapping::TypeMappingSource;

/// Primary key supporting both single and composite keys
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum KeyDefinition {
    Single(String),
    Composite(Vec<String>),
}

impl KeyDefinition {
    pub fn properties(&self) -> Vec<&str> {
        match self {
            KeyDefinition::Single(p) => vec![p.as_str()],
            KeyDefinition::Composite(ps) => ps.iter().map(|s| s.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDefinition {
    /// Column name; defaults to the property name
    #[serde(default)]
    pub column: Option<String>,
    pub store_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavigationDefinition {
    pub target: String,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub primary_key: KeyDefinition,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub navigations: BTreeMap<String, NavigationDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub entities: Vec<EntityDefinition>,
}

impl ModelConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let contents = fs::read_to_string(path).map_err(|e| ModelError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ModelError> {
        serde_yaml::from_str(yaml).map_err(|e| ModelError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural validation: unique names, resolvable keys and navigation targets.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.entities.is_empty() {
            return Err(ModelError::Empty);
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(ModelError::DuplicateEntity {
                    entity: entity.name.clone(),
                });
            }
        }

        for entity in &self.entities {
            let key = entity.primary_key.properties();
            if key.is_empty() {
                return Err(ModelError::EmptyPrimaryKey {
                    entity: entity.name.clone(),
                });
            }
            for property in key {
                if !entity.properties.contains_key(property) {
                    return Err(ModelError::UnknownKeyProperty {
                        entity: entity.name.clone(),
                        property: property.to_string(),
                    });
                }
            }

            for (name, navigation) in &entity.navigations {
                if entity.properties.contains_key(name) {
                    return Err(ModelError::AmbiguousMember {
                        entity: entity.name.clone(),
                        name: name.clone(),
                    });
                }
                if !seen.contains(navigation.target.as_str()) {
                    return Err(ModelError::UnknownNavigationTarget {
                        entity: entity.name.clone(),
                        navigation: name.clone(),
                        target: navigation.target.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ResolvedEntity {
    table: String,
    primary_key: Vec<String>,
    columns: HashMap<String, ColumnBinding>,
    navigations: HashMap<String, NavigationBinding>,
}

/// [`ModelMetadata`] built from a validated [`ModelConfig`].
#[derive(Debug, Clone)]
pub struct StaticModel {
    entities: HashMap<String, ResolvedEntity>,
}

impl StaticModel {
    /// Resolve every property's store type against the registry.
    pub fn from_config(
        config: &ModelConfig,
        type_mappings: &dyn TypeMappingSource,
    ) -> Result<Self, ModelError> {
        config.validate()?;

        let mut entities = HashMap::new();
        for entity in &config.entities {
            let mut columns = HashMap::new();
            for (name, property) in &entity.properties {
                let mut type_mapping = type_mappings
                    .find_mapping_for_store_type(&property.store_type)
                    .map_err(|source| ModelError::InvalidStoreType {
                        entity: entity.name.clone(),
                        property: name.clone(),
                        source,
                    })?;
                if let Some(collation) = &property.collation {
                    type_mapping = type_mapping.with_collation(collation.clone());
                }

                columns.insert(
                    name.clone(),
                    ColumnBinding {
                        column: property.column.clone().unwrap_or_else(|| name.clone()),
                        type_mapping,
                        nullable: property.nullable,
                    },
                );
            }

            let navigations = entity
                .navigations
                .iter()
                .map(|(name, nav)| {
                    (
                        name.clone(),
                        NavigationBinding {
                            target_entity: nav.target.clone(),
                            optional: nav.optional,
                        },
                    )
                })
                .collect();

            log::debug!(
                "Loaded entity {} -> {} ({} columns)",
                entity.name,
                entity.table,
                columns.len()
            );

            entities.insert(
                entity.name.clone(),
                ResolvedEntity {
                    table: entity.table.clone(),
                    primary_key: entity
                        .primary_key
                        .properties()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    columns,
                    navigations,
                },
            );
        }

        Ok(StaticModel { entities })
    }

    pub fn from_yaml_str(
        yaml: &str,
        type_mappings: &dyn TypeMappingSource,
    ) -> Result<Self, ModelError> {
        Self::from_config(&ModelConfig::from_yaml_str(yaml)?, type_mappings)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(
        path: P,
        type_mappings: &dyn TypeMappingSource,
    ) -> Result<Self, ModelError> {
        Self::from_config(&ModelConfig::from_yaml_file(path)?, type_mappings)
    }

    pub fn table_name(&self, entity_type: &str) -> Option<&str> {
        self.entities.get(entity_type).map(|e| e.table.as_str())
    }

    pub fn contains_entity(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }
}

impl ModelMetadata for StaticModel {
    fn resolve_column(&self, entity_type: &str, property: &str) -> Option<ColumnBinding> {
        self.entities
            .get(entity_type)?
            .columns
            .get(property)
            .cloned()
    }

    fn resolve_navigation(&self, entity_type: &str, navigation: &str) -> Option<NavigationBinding> {
        self.entities
            .get(entity_type)?
            .navigations
            .get(navigation)
            .cloned()
    }

    fn primary_key(&self, entity_type: &str) -> Vec<String> {
        self.entities
            .get(entity_type)
            .map(|e| e.primary_key.clone())
            .unwrap_or_default()
    }
}
