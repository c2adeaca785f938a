//! Dirty-check reactions.
//!
//! A reaction consumes one diff delivered by a record's observer (or the
//! empty first-time diff at creation) and brings the record's bookkeeping up
//! to date: timestamps, change history and computed fields. Relation
//! re-linking needs the whole store, so the reaction only reports which
//! relations to re-link and the caller does it.

use serde_json::Value;
use tracing::{debug, error};

use recstore_diff::FieldDiff;
use recstore_store::{ChangeRecord, Clock, ResourceTable, StoreError};
use recstore_types::{is_populated, RecordId, Timestamp};

use crate::computed;
use crate::definition::ResourceDefinition;
use crate::error::InjectResult;
use crate::options::ResolvedOptions;

/// What a reaction did and what it leaves for the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReactionOutcome {
    /// Stamp applied to `modified`, if the diff counted as a data change.
    pub stamped: Option<Timestamp>,
    /// Whether a change record was appended.
    pub recorded: bool,
    pub recomputed: Vec<String>,
    /// Related resource names whose links must be refreshed.
    pub relink: Vec<String>,
    /// New identity value, if the identity field changed.
    pub identity_mutation: Option<Value>,
}

/// Shared inputs of a reaction.
pub struct Reactor<'a> {
    pub definition: &'a ResourceDefinition,
    pub options: &'a ResolvedOptions,
    pub clock: &'a dyn Clock,
}

impl Reactor<'_> {
    /// React to `diff` for record `id` of `table`.
    ///
    /// `id` is the key the record was injected under, which is the identity
    /// value before any mutation in `diff`.
    pub fn react(
        &self,
        table: &mut ResourceTable,
        id: &RecordId,
        mut diff: FieldDiff,
        first_time: bool,
    ) -> InjectResult<ReactionOutcome> {
        let definition = self.definition;
        let record = table.lookup(id).ok_or_else(|| StoreError::UnknownRecord {
            resource: definition.name().to_owned(),
            id: id.clone(),
        })?;
        let mut outcome = ReactionOutcome::default();

        diff.strip(definition.relation_fields());

        if !diff.is_empty() || first_time {
            let at = self.clock.now();
            table.stamp_modified(id, at);
            outcome.stamped = Some(at);

            if self.options.keep_change_history {
                table.append_change(ChangeRecord {
                    resource: definition.name().to_owned(),
                    id: id.clone(),
                    target: record.clone(),
                    added: diff.added.clone(),
                    removed: diff.removed.clone(),
                    changed: diff.changed.clone(),
                    timestamp: at,
                });
                outcome.recorded = true;
            }
        }

        if !definition.computed_fields().is_empty() {
            outcome.recomputed = computed::recompute(definition, &record, &diff);
        }

        for relation in definition.relations() {
            let linked = record
                .get(&relation.local_field)
                .is_some_and(|value| is_populated(&value));
            let key_touched = relation
                .local_key
                .as_deref()
                .is_some_and(|key| diff.touches(key));
            if linked && key_touched && !outcome.relink.contains(&relation.relation) {
                outcome.relink.push(relation.relation.clone());
            }
        }

        if let Some(new) = diff.changed.get(definition.id_field()) {
            error!(
                resource = definition.name(),
                %id,
                new = %new,
                "identity field changed; table entries for this record are now undefined"
            );
            outcome.identity_mutation = Some(new.clone());
        }

        debug!(
            resource = definition.name(),
            %id,
            first_time,
            changes = diff.len(),
            recomputed = outcome.recomputed.len(),
            "reaction"
        );
        Ok(outcome)
    }
}
