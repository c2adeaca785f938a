use std::collections::{HashMap, HashSet};

use serde::Serialize;

use recstore_types::{Attributes, RecordId, Timestamp};

use crate::record::RecordRef;

/// One detected mutation of a record.
#[derive(Clone, Debug, Serialize)]
pub struct ChangeRecord {
    pub resource: String,
    pub id: RecordId,
    /// The mutated record.
    #[serde(skip)]
    pub target: RecordRef,
    pub added: Attributes,
    pub removed: Attributes,
    pub changed: Attributes,
    /// Equal to the record's `modified` stamp when appended.
    pub timestamp: Timestamp,
}

/// Position of a change record in the history arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HistoryIndex(usize);

/// Change history of one resource type.
///
/// Records are owned by a single arena. The per-record histories and the
/// type-wide timeline are ordered lists of arena indices, so clearing a
/// record's history removes it from both views at once. Freed slots are
/// reused by later appends.
#[derive(Debug, Default)]
pub struct ChangeHistory {
    arena: Vec<Option<ChangeRecord>>,
    free: Vec<usize>,
    by_record: HashMap<RecordId, Vec<HistoryIndex>>,
    timeline: Vec<HistoryIndex>,
}

impl ChangeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id` with an empty history.
    pub fn open(&mut self, id: RecordId) {
        self.by_record.entry(id).or_default();
    }

    pub fn is_tracking(&self, id: &RecordId) -> bool {
        self.by_record.contains_key(id)
    }

    /// Append a change record to its record's history and to the timeline.
    pub fn append(&mut self, record: ChangeRecord) -> HistoryIndex {
        let id = record.id.clone();
        let index = match self.free.pop() {
            Some(slot) => {
                self.arena[slot] = Some(record);
                HistoryIndex(slot)
            }
            None => {
                self.arena.push(Some(record));
                HistoryIndex(self.arena.len() - 1)
            }
        };
        self.by_record.entry(id).or_default().push(index);
        self.timeline.push(index);
        index
    }

    pub fn get(&self, index: HistoryIndex) -> Option<&ChangeRecord> {
        self.arena.get(index.0).and_then(Option::as_ref)
    }

    /// History of a single record, oldest first.
    pub fn for_record(&self, id: &RecordId) -> Vec<&ChangeRecord> {
        self.by_record
            .get(id)
            .map(|indices| indices.iter().filter_map(|i| self.get(*i)).collect())
            .unwrap_or_default()
    }

    /// Type-wide history, oldest first.
    pub fn timeline(&self) -> impl Iterator<Item = &ChangeRecord> + '_ {
        self.timeline.iter().filter_map(|i| self.get(*i))
    }

    /// Drop every change record of `id` from both views.
    ///
    /// Returns the number of records removed. The record stays tracked.
    pub fn clear_record(&mut self, id: &RecordId) -> usize {
        let Some(indices) = self.by_record.get_mut(id) else {
            return 0;
        };
        if indices.is_empty() {
            return 0;
        }
        let dropped: HashSet<HistoryIndex> = indices.drain(..).collect();
        self.timeline.retain(|i| !dropped.contains(i));
        for index in &dropped {
            self.arena[index.0] = None;
            self.free.push(index.0);
        }
        dropped.len()
    }

    /// Number of live change records.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(id: i64, stamp: u64) -> ChangeRecord {
        ChangeRecord {
            resource: "post".into(),
            id: RecordId::Int(id),
            target: RecordRef::new(Attributes::new()),
            added: Attributes::new(),
            removed: Attributes::new(),
            changed: json!({"n": stamp}).as_object().cloned().unwrap(),
            timestamp: Timestamp::new(0, stamp),
        }
    }

    #[test]
    fn append_feeds_both_views() {
        let mut history = ChangeHistory::new();
        history.open(RecordId::Int(1));
        history.append(change(1, 1));
        history.append(change(2, 2));
        history.append(change(1, 3));

        let one = history.for_record(&RecordId::Int(1));
        assert_eq!(one.len(), 2);
        assert_eq!(one[0].timestamp, Timestamp::new(0, 1));
        assert_eq!(one[1].timestamp, Timestamp::new(0, 3));

        let stamps: Vec<u64> = history.timeline().map(|c| c.timestamp.logical).collect();
        assert_eq!(stamps, vec![1, 2, 3]);
    }

    #[test]
    fn clear_record_removes_from_both_views() {
        let mut history = ChangeHistory::new();
        history.append(change(1, 1));
        history.append(change(2, 2));
        history.append(change(1, 3));

        assert_eq!(history.clear_record(&RecordId::Int(1)), 2);
        assert!(history.for_record(&RecordId::Int(1)).is_empty());
        assert!(history.is_tracking(&RecordId::Int(1)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.timeline().next().unwrap().id, RecordId::Int(2));
    }

    #[test]
    fn freed_slots_are_reused_in_order() {
        let mut history = ChangeHistory::new();
        history.append(change(1, 1));
        history.append(change(2, 2));
        history.clear_record(&RecordId::Int(1));
        history.append(change(3, 3));

        assert_eq!(history.arena.len(), 2);
        let ids: Vec<RecordId> = history.timeline().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(3)]);
    }

    #[test]
    fn unknown_record_is_empty() {
        let mut history = ChangeHistory::new();
        assert!(history.for_record(&RecordId::Int(7)).is_empty());
        assert_eq!(history.clear_record(&RecordId::Int(7)), 0);
    }
}
