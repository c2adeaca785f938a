use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use recstore_diff::FieldDiff;
use recstore_store::{ChangeRecord, Clock, RecordRef, ResourceTable};
use recstore_types::{deep_merge, Attributes, RecordId, Timestamp};

use crate::config::StoreConfig;
use crate::definition::ResourceDefinition;
use crate::error::{InjectError, InjectResult};
use crate::events::{EventSink, TracingSink};
use crate::identity::resolve_identity;
use crate::linker::{ForeignKeyLinker, Linker};
use crate::options::{InjectOptions, ResolvedOptions};
use crate::reactor::Reactor;
use crate::registry::DefinitionRegistry;

/// Result of one [`DataStore::inject`] call, shaped like its input.
#[derive(Debug)]
pub enum Injected {
    /// A single payload was injected.
    One(RecordRef),
    /// A batch was injected; one entry per input element, in input order.
    Many(Vec<InjectResult<RecordRef>>),
}

impl Injected {
    /// Successfully injected records, in input order.
    pub fn records(&self) -> Vec<RecordRef> {
        match self {
            Self::One(record) => vec![record.clone()],
            Self::Many(results) => results.iter().filter_map(|r| r.as_ref().ok().cloned()).collect(),
        }
    }

    /// Number of successfully injected records.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(results) => results.iter().filter(|r| r.is_ok()).count(),
        }
    }

    /// Returns `true` if no record was injected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The record of a single-payload injection.
    pub fn one(self) -> Option<RecordRef> {
        match self {
            Self::One(record) => Some(record),
            Self::Many(_) => None,
        }
    }

    /// The per-element results of a batch injection.
    pub fn many(self) -> Option<Vec<InjectResult<RecordRef>>> {
        match self {
            Self::One(_) => None,
            Self::Many(results) => Some(results),
        }
    }

    /// JSON view; failed batch elements appear as `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::One(record) => record.to_value(),
            Self::Many(results) => Value::Array(
                results
                    .iter()
                    .map(|r| r.as_ref().map_or(Value::Null, RecordRef::to_value))
                    .collect(),
            ),
        }
    }
}

/// In-process object store: definitions, one table per resource type, and
/// the injection pipeline that keeps them consistent.
///
/// All operations are synchronous and run to completion. Relation faults
/// that do not abort an injection are logged and kept until
/// [`DataStore::take_faults`].
pub struct DataStore {
    pub(crate) config: StoreConfig,
    pub(crate) registry: DefinitionRegistry,
    pub(crate) tables: HashMap<String, ResourceTable>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) linker: Box<dyn Linker>,
    pub(crate) events: Box<dyn EventSink>,
    pub(crate) faults: Vec<InjectError>,
}

impl DataStore {
    pub fn new(config: StoreConfig) -> Self {
        let clock = config.build_clock();
        Self {
            config,
            registry: DefinitionRegistry::new(),
            tables: HashMap::new(),
            clock,
            linker: Box::new(ForeignKeyLinker),
            events: Box::new(TracingSink),
            faults: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_linker(mut self, linker: Box<dyn Linker>) -> Self {
        self.linker = linker;
        self
    }

    pub fn with_event_sink(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Definitions ----

    /// Register a resource type and create its empty table.
    pub fn define(&mut self, definition: ResourceDefinition) -> InjectResult<Arc<ResourceDefinition>> {
        let definition = self.registry.register(definition)?;
        self.tables.insert(
            definition.name().to_owned(),
            ResourceTable::new(definition.name()),
        );
        debug!(resource = definition.name(), "resource defined");
        Ok(definition)
    }

    pub fn definition(&self, name: &str) -> Option<Arc<ResourceDefinition>> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    // ---- Reads ----

    pub fn table(&self, name: &str) -> Option<&ResourceTable> {
        self.tables.get(name)
    }

    pub fn get(&self, name: &str, id: &RecordId) -> Option<RecordRef> {
        self.tables.get(name).and_then(|table| table.lookup(id))
    }

    /// Every record of `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<RecordRef> {
        self.tables
            .get(name)
            .map(ResourceTable::records)
            .unwrap_or_default()
    }

    /// Identity of `record` as a record of `name`.
    pub fn identity_of(&self, name: &str, record: &RecordRef) -> Option<RecordId> {
        let definition = self.registry.get(name)?;
        let value = record.get(definition.id_field())?;
        RecordId::from_value(&value).ok()
    }

    pub fn change_history(&self, name: &str, id: &RecordId) -> Vec<ChangeRecord> {
        self.tables
            .get(name)
            .map(|table| table.history().for_record(id).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Type-wide change history of `name`, oldest first.
    pub fn collection_history(&self, name: &str) -> Vec<ChangeRecord> {
        self.tables
            .get(name)
            .map(|table| table.history().timeline().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_modified(&self, name: &str, id: &RecordId) -> Option<Timestamp> {
        self.tables.get(name).and_then(|table| table.modified(id))
    }

    pub fn last_saved(&self, name: &str, id: &RecordId) -> Option<Timestamp> {
        self.tables.get(name).and_then(|table| table.saved(id))
    }

    pub fn collection_modified(&self, name: &str) -> Option<Timestamp> {
        self.tables.get(name).map(ResourceTable::collection_modified)
    }

    /// Drain relation faults reported since the last call.
    pub fn take_faults(&mut self) -> Vec<InjectError> {
        std::mem::take(&mut self.faults)
    }

    // ---- Injection ----

    /// Inject one payload object or an array of them into resource `name`.
    ///
    /// New identities create records; known identities are deep-merged into
    /// the existing record, so handles obtained earlier see the update.
    /// Returns the record(s) in the shape of the input.
    pub fn inject(&mut self, name: &str, attrs: Value, options: &InjectOptions) -> InjectResult<Injected> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| InjectError::UnknownResource(name.to_owned()))?;
        if !attrs.is_object() && !attrs.is_array() {
            return Err(InjectError::InvalidPayload {
                resource: name.to_owned(),
                found: json_kind(&attrs).to_owned(),
            });
        }

        let resolved = self.config.defaults.overlay(definition.defaults()).overlay(options);

        if resolved.notify {
            definition.lifecycle().before_inject(name, &attrs);
        }

        let injected = match attrs {
            Value::Array(items) => {
                let mut results = Vec::with_capacity(items.len());
                for (position, item) in items.into_iter().enumerate() {
                    let result = match item {
                        Value::Object(map) => self.inject_one(&definition, map, &resolved, options),
                        other => Err(InjectError::InvalidPayload {
                            resource: name.to_owned(),
                            found: json_kind(&other).to_owned(),
                        }),
                    };
                    if let Err(err) = &result {
                        warn!(resource = name, position, error = %err, "batch element not injected");
                    }
                    results.push(result);
                }
                Injected::Many(results)
            }
            Value::Object(map) => Injected::One(self.inject_one(&definition, map, &resolved, options)?),
            other => {
                return Err(InjectError::InvalidPayload {
                    resource: name.to_owned(),
                    found: json_kind(&other).to_owned(),
                })
            }
        };

        let store: &DataStore = self;
        let records = injected.records();
        if resolved.find_inverse_links {
            for record in &records {
                if let Some(id) = store.identity_of(name, record) {
                    store.linker.link_inverse(store, name, &id);
                }
            }
        }
        for record in &records {
            store.link_discovered(&definition, record, &resolved);
        }

        if resolved.notify {
            definition.lifecycle().after_inject(name, &injected);
            self.events.emit(&definition, "inject", &injected);
        }

        Ok(injected)
    }

    /// Flush every observer and react to pending changes until the store
    /// settles.
    ///
    /// Picks up mutations made through held [`RecordRef`]s. Every record is
    /// visited even if one fails; the first fault is returned. On success
    /// returns the number of reactions run.
    pub fn digest(&mut self) -> InjectResult<usize> {
        let mut reactions = 0;
        let mut first_fault = None;

        for name in self.registry.names().to_vec() {
            let Some(definition) = self.registry.get(&name) else {
                continue;
            };
            let resolved = self.config.defaults.overlay(definition.defaults());
            let ids = self
                .tables
                .get(&name)
                .map(|table| table.ids().to_vec())
                .unwrap_or_default();
            for id in ids {
                match self.settle(&definition, &id, &resolved) {
                    Ok(rounds) => reactions += rounds,
                    Err(err) => {
                        error!(resource = %name, %id, error = %err, "digest fault");
                        first_fault.get_or_insert(err);
                    }
                }
            }
        }

        match first_fault {
            Some(err) => Err(err),
            None => Ok(reactions),
        }
    }

    fn inject_one(
        &mut self,
        definition: &ResourceDefinition,
        mut attrs: Attributes,
        resolved: &ResolvedOptions,
        options: &InjectOptions,
    ) -> InjectResult<RecordRef> {
        let id = resolve_identity(definition, &mut attrs)?;
        let existing = self.table_mut(definition.name())?.lookup(&id);

        let record = match existing {
            None => self.create_record(definition, &id, attrs, resolved, options)?,
            Some(record) => {
                self.merge_record(definition, &id, &record, attrs, resolved, options)?;
                record
            }
        };

        let at = self.clock.now();
        self.table_mut(definition.name())?.stamp_saved(&id, at);
        Ok(record)
    }

    fn create_record(
        &mut self,
        definition: &ResourceDefinition,
        id: &RecordId,
        attrs: Attributes,
        resolved: &ResolvedOptions,
        options: &InjectOptions,
    ) -> InjectResult<RecordRef> {
        let incoming = attrs.clone();
        let item = match definition.record_class().filter(|_| resolved.use_class) {
            Some(class) if class.is_instance(&attrs) => attrs,
            Some(class) => {
                let mut item = class.construct();
                deep_merge(&mut item, &attrs);
                item
            }
            None => attrs,
        };

        let record = self
            .table_mut(definition.name())?
            .create(id.clone(), item, &incoming)?;

        self.react(definition, id, FieldDiff::new(), true, resolved)?;
        self.inject_relations(definition, &record, &incoming, options);
        self.settle(definition, id, resolved)?;
        Ok(record)
    }

    fn merge_record(
        &mut self,
        definition: &ResourceDefinition,
        id: &RecordId,
        record: &RecordRef,
        attrs: Attributes,
        resolved: &ResolvedOptions,
        options: &InjectOptions,
    ) -> InjectResult<()> {
        self.table_mut(definition.name())?.merge(id, &attrs)?;
        self.inject_relations(definition, record, &attrs, options);

        if resolved.reset_history_on_inject {
            let table = self.table_mut(definition.name())?;
            table.reset_previous(id, &attrs);
            let cleared = table.clear_history(id);
            debug!(resource = definition.name(), %id, cleared, "history reset on inject");
        }

        self.settle(definition, id, resolved)?;
        Ok(())
    }

    /// Run one reaction and the re-links it asks for.
    pub(crate) fn react(
        &mut self,
        definition: &ResourceDefinition,
        id: &RecordId,
        diff: FieldDiff,
        first_time: bool,
        resolved: &ResolvedOptions,
    ) -> InjectResult<()> {
        let table = self
            .tables
            .get_mut(definition.name())
            .ok_or_else(|| InjectError::UnknownResource(definition.name().to_owned()))?;
        let reactor = Reactor {
            definition,
            options: resolved,
            clock: self.clock.as_ref(),
        };
        let outcome = reactor.react(table, id, diff, first_time)?;

        if !outcome.relink.is_empty() {
            let store: &DataStore = self;
            store.linker.link(store, definition.name(), id, &outcome.relink);
        }

        match outcome.identity_mutation {
            Some(new) => Err(InjectError::IdentityMutated {
                resource: definition.name().to_owned(),
                id: id.clone(),
                new,
            }),
            None => Ok(()),
        }
    }

    /// Deliver and react until the record's observer reports nothing.
    ///
    /// Returns the number of reactions run.
    pub(crate) fn settle(
        &mut self,
        definition: &ResourceDefinition,
        id: &RecordId,
        resolved: &ResolvedOptions,
    ) -> InjectResult<usize> {
        let mut rounds = 0;
        loop {
            let Some(diff) = self.table_mut(definition.name())?.deliver(id)? else {
                return Ok(rounds);
            };
            if rounds >= self.config.max_reaction_rounds {
                return Err(InjectError::ReactionLimitExceeded {
                    resource: definition.name().to_owned(),
                    id: id.clone(),
                    rounds,
                });
            }
            rounds += 1;
            self.react(definition, id, diff, false, resolved)?;
        }
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> InjectResult<&mut ResourceTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| InjectError::UnknownResource(name.to_owned()))
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("resources", &self.registry.names())
            .field("faults", &self.faults.len())
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
