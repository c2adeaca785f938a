use std::collections::HashMap;

use tracing::debug;

use recstore_diff::{FieldDiff, Observer};
use recstore_types::{Attributes, RecordId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::history::{ChangeHistory, ChangeRecord, HistoryIndex};
use crate::record::RecordRef;

/// All records of one resource type plus their bookkeeping.
pub struct ResourceTable {
    name: String,
    index: HashMap<RecordId, RecordRef>,
    /// Insertion order of identities.
    order: Vec<RecordId>,
    /// Attributes as last injected, for inspection only. Observers track
    /// the live record instead.
    previous: HashMap<RecordId, Attributes>,
    modified: HashMap<RecordId, Timestamp>,
    saved: HashMap<RecordId, Timestamp>,
    collection_modified: Timestamp,
    history: ChangeHistory,
    observers: HashMap<RecordId, Observer>,
}

impl ResourceTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: HashMap::new(),
            order: Vec::new(),
            previous: HashMap::new(),
            modified: HashMap::new(),
            saved: HashMap::new(),
            collection_modified: Timestamp::zero(),
            history: ChangeHistory::new(),
            observers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, id: &RecordId) -> Option<RecordRef> {
        self.index.get(id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Identities in insertion order.
    pub fn ids(&self) -> &[RecordId] {
        &self.order
    }

    /// Records in insertion order.
    pub fn records(&self) -> Vec<RecordRef> {
        self.order
            .iter()
            .filter_map(|id| self.index.get(id).cloned())
            .collect()
    }

    /// Register a newly allocated record.
    ///
    /// `incoming` is the raw payload the record was built from and becomes
    /// its previous snapshot. The observer baseline is the record itself, so
    /// anything written after this call is reported on the next delivery.
    pub fn create(
        &mut self,
        id: RecordId,
        record: Attributes,
        incoming: &Attributes,
    ) -> StoreResult<RecordRef> {
        if self.index.contains_key(&id) {
            return Err(StoreError::DuplicateRecord {
                resource: self.name.clone(),
                id,
            });
        }

        self.observers
            .insert(id.clone(), Observer::open(record.clone()));
        self.previous.insert(id.clone(), incoming.clone());
        self.modified.insert(id.clone(), Timestamp::zero());
        self.history.open(id.clone());

        let handle = RecordRef::new(record);
        self.index.insert(id.clone(), handle.clone());
        debug!(resource = %self.name, %id, "record created");
        self.order.push(id);
        Ok(handle)
    }

    /// Deep-merge `attrs` into an existing record in place.
    pub fn merge(&mut self, id: &RecordId, attrs: &Attributes) -> StoreResult<RecordRef> {
        let record = self.require(id)?;
        record.merge(attrs);
        Ok(record)
    }

    /// Attributes of the injection that created `id`, or of the last reset.
    pub fn previous(&self, id: &RecordId) -> Option<&Attributes> {
        self.previous.get(id)
    }

    /// Replace the previous snapshot of `id` with a copy of `attrs`.
    pub fn reset_previous(&mut self, id: &RecordId, attrs: &Attributes) {
        self.previous.insert(id.clone(), attrs.clone());
    }

    /// Stamp a mutation of `id` at `at`.
    pub fn stamp_modified(&mut self, id: &RecordId, at: Timestamp) {
        self.modified.insert(id.clone(), at);
        if at > self.collection_modified {
            self.collection_modified = at;
        }
    }

    /// Stamp an injection of `id` at `at`.
    pub fn stamp_saved(&mut self, id: &RecordId, at: Timestamp) {
        self.saved.insert(id.clone(), at);
    }

    pub fn modified(&self, id: &RecordId) -> Option<Timestamp> {
        self.modified.get(id).copied()
    }

    pub fn saved(&self, id: &RecordId) -> Option<Timestamp> {
        self.saved.get(id).copied()
    }

    pub fn collection_modified(&self) -> Timestamp {
        self.collection_modified
    }

    /// Deliver pending changes of `id` from its observer.
    pub fn deliver(&mut self, id: &RecordId) -> StoreResult<Option<FieldDiff>> {
        let current = self.require(id)?.snapshot();
        let observer = self
            .observers
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownRecord {
                resource: self.name.clone(),
                id: id.clone(),
            })?;
        Ok(observer.deliver(&current))
    }

    pub fn history(&self) -> &ChangeHistory {
        &self.history
    }

    pub fn append_change(&mut self, change: ChangeRecord) -> HistoryIndex {
        self.history.append(change)
    }

    /// Drop the change history of `id`; returns how many records went.
    pub fn clear_history(&mut self, id: &RecordId) -> usize {
        self.history.clear_record(id)
    }

    fn require(&self, id: &RecordId) -> StoreResult<RecordRef> {
        self.lookup(id).ok_or_else(|| StoreError::UnknownRecord {
            resource: self.name.clone(),
            id: id.clone(),
        })
    }
}

impl std::fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTable")
            .field("name", &self.name)
            .field("record_count", &self.index.len())
            .field("history_len", &self.history.len())
            .field("collection_modified", &self.collection_modified)
            .finish()
    }
}
