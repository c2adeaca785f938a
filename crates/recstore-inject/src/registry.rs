use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{RelationDef, ResourceDefinition};
use crate::error::{InjectError, InjectResult};

/// Registered resource definitions, in registration order.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Arc<ResourceDefinition>>,
    order: Vec<String>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a definition.
    pub fn register(&mut self, definition: ResourceDefinition) -> InjectResult<Arc<ResourceDefinition>> {
        definition
            .validate()
            .map_err(|reason| InjectError::InvalidDefinition {
                resource: definition.name().to_owned(),
                reason,
            })?;
        if self.definitions.contains_key(definition.name()) {
            return Err(InjectError::DuplicateResource(definition.name().to_owned()));
        }

        let name = definition.name().to_owned();
        let definition = Arc::new(definition);
        self.definitions.insert(name.clone(), Arc::clone(&definition));
        self.order.push(name);
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResourceDefinition>> {
        self.definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Resource names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every relation, across all definitions, that targets `resource`.
    pub fn referencing(&self, resource: &str) -> Vec<(Arc<ResourceDefinition>, RelationDef)> {
        self.order
            .iter()
            .filter_map(|name| self.definitions.get(name))
            .flat_map(|definition| {
                definition
                    .relations()
                    .iter()
                    .filter(|relation| relation.relation == resource)
                    .map(|relation| (Arc::clone(definition), relation.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
