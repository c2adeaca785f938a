//! Nested relation injection, post-injection link discovery and relation
//! resolution.

use serde_json::Value;
use tracing::{error, warn};

use recstore_store::RecordRef;
use recstore_types::{Attributes, RecordId};

use crate::definition::{RelationKind, ResourceDefinition};
use crate::error::{InjectError, InjectResult};
use crate::options::{InjectOptions, ResolvedOptions};
use crate::store::DataStore;

/// Records a relation field refers to.
#[derive(Debug, Clone)]
pub enum Related {
    None,
    One(RecordRef),
    Many(Vec<RecordRef>),
}

impl Related {
    pub fn one(self) -> Option<RecordRef> {
        match self {
            Self::One(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_vec(self) -> Vec<RecordRef> {
        match self {
            Self::None => Vec::new(),
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

impl DataStore {
    /// Inject the nested relation payloads among `incoming` (the attributes
    /// just injected into `record`) and replace them with the injected
    /// identities.
    ///
    /// Only objects are injected. Identities already present, alone or as
    /// elements of a list, are kept as they are. Faults are logged and kept
    /// for [`DataStore::take_faults`]; the host record is injected either
    /// way.
    pub(crate) fn inject_relations(
        &mut self,
        definition: &ResourceDefinition,
        record: &RecordRef,
        incoming: &Attributes,
        options: &InjectOptions,
    ) {
        for relation in definition.relations() {
            let Some(payload) = incoming.get(&relation.local_field).filter(|payload| match payload {
                Value::Object(_) => true,
                Value::Array(items) => items.iter().any(Value::is_object),
                _ => false,
            }) else {
                continue;
            };

            let Some(target) = self.registry.get(&relation.relation) else {
                let fault = InjectError::RelationDefinitionMissing {
                    resource: definition.name().to_owned(),
                    relation: relation.relation.clone(),
                };
                warn!(error = %fault, "relation payload skipped");
                self.faults.push(fault);
                continue;
            };

            match payload.clone() {
                Value::Array(items) => {
                    let objects: Vec<Value> = items.iter().filter(|item| item.is_object()).cloned().collect();
                    let mut results = match self.inject(&relation.relation, Value::Array(objects), options) {
                        Ok(injected) => injected.many().unwrap_or_default().into_iter(),
                        Err(source) => {
                            self.nested_fault(definition, relation.kind, &relation.relation, source);
                            continue;
                        }
                    };

                    let mut ids = Vec::with_capacity(items.len());
                    for item in items {
                        if !item.is_object() {
                            ids.push(item);
                            continue;
                        }
                        match results.next() {
                            Some(Ok(related)) => {
                                if let Some(related_id) = self.identity_of(target.name(), &related) {
                                    ids.push(related_id.to_value());
                                }
                            }
                            Some(Err(source)) => {
                                self.nested_fault(definition, relation.kind, &relation.relation, source)
                            }
                            None => {}
                        }
                    }
                    record.set(relation.local_field.clone(), Value::Array(ids));
                }
                payload => match self.inject(&relation.relation, payload, options) {
                    Ok(injected) => {
                        let related_id = injected
                            .one()
                            .and_then(|related| self.identity_of(target.name(), &related));
                        if let Some(related_id) = related_id {
                            record.set(relation.local_field.clone(), related_id.to_value());
                        }
                    }
                    Err(source) => self.nested_fault(definition, relation.kind, &relation.relation, source),
                },
            }
        }
    }

    fn nested_fault(
        &mut self,
        definition: &ResourceDefinition,
        kind: RelationKind,
        relation: &str,
        source: InjectError,
    ) {
        let fault = InjectError::NestedInjectionFailed {
            resource: definition.name().to_owned(),
            relation: relation.to_owned(),
            kind,
            source: Box::new(source),
        };
        error!(error = %fault, "nested injection failed");
        self.faults.push(fault);
    }

    /// Ask the linker to refresh the relations enabled by `options`.
    pub(crate) fn link_discovered(
        &self,
        definition: &ResourceDefinition,
        record: &RecordRef,
        options: &ResolvedOptions,
    ) {
        let Some(id) = self.identity_of(definition.name(), record) else {
            return;
        };
        for relation in definition.relations() {
            let enabled = match relation.kind {
                RelationKind::BelongsTo => options.find_belongs_to,
                RelationKind::HasOne => options.find_has_one,
                RelationKind::HasMany => options.find_has_many,
            };
            if enabled {
                self.linker.link(
                    self,
                    definition.name(),
                    &id,
                    std::slice::from_ref(&relation.relation),
                );
            }
        }
    }

    /// Resolve the identities held in `record`'s relation field `field`
    /// into record handles. Identities with no record are skipped.
    pub fn resolve_relation(
        &self,
        resource: &str,
        record: &RecordRef,
        field: &str,
    ) -> InjectResult<Related> {
        let definition = self
            .registry
            .get(resource)
            .ok_or_else(|| InjectError::UnknownResource(resource.to_owned()))?;
        let relation = definition
            .relation_for_field(field)
            .ok_or_else(|| InjectError::UnknownRelation {
                resource: resource.to_owned(),
                field: field.to_owned(),
            })?;

        let related = match record.get(field) {
            Some(Value::Array(ids)) => Related::Many(
                ids.iter()
                    .filter_map(|value| RecordId::from_value(value).ok())
                    .filter_map(|id| self.get(&relation.relation, &id))
                    .collect(),
            ),
            Some(value) => RecordId::from_value(&value)
                .ok()
                .and_then(|id| self.get(&relation.relation, &id))
                .map_or(Related::None, Related::One),
            None => Related::None,
        };
        Ok(related)
    }
}
