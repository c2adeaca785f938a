//! Relation linking.
//!
//! Relations store identities, never embedded records. Linking fills a
//! record's relation field with the identity (or identities) of the related
//! records currently in the store; [`DataStore::resolve_relation`] turns
//! them back into record handles on demand.
//!
//! [`DataStore::resolve_relation`]: crate::DataStore::resolve_relation

use serde_json::Value;
use tracing::debug;

use recstore_store::RecordRef;
use recstore_types::RecordId;

use crate::definition::{RelationDef, RelationKind};
use crate::store::DataStore;

/// Establishes links between related records.
///
/// The store decides when to link; implementations decide how.
pub trait Linker: Send + Sync {
    /// Refresh the relations of `resource`/`id` whose target resource is
    /// listed in `relations`.
    fn link(&self, store: &DataStore, resource: &str, id: &RecordId, relations: &[String]);

    /// Refresh relations of other records that point at `resource`/`id`.
    fn link_inverse(&self, store: &DataStore, resource: &str, id: &RecordId);
}

/// Linker for hosts that maintain links themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLinker;

impl Linker for NoopLinker {
    fn link(&self, _store: &DataStore, _resource: &str, _id: &RecordId, _relations: &[String]) {}

    fn link_inverse(&self, _store: &DataStore, _resource: &str, _id: &RecordId) {}
}

/// Links through identity keys.
///
/// - belongsTo: the record's `local_key` names the related identity. A key
///   naming no record clears the field to `null`; an absent key leaves it
///   alone.
/// - hasOne / hasMany: related records whose `foreign_key` equals the
///   record's identity, in insertion order. Identities already held stay
///   while their record exists and its `foreign_key` does not name another
///   owner.
///
/// Values that are not identities (unresolved nested payloads) are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForeignKeyLinker;

impl ForeignKeyLinker {
    /// The value `relation`'s field should hold, or `None` to leave it.
    fn find(store: &DataStore, relation: &RelationDef, id: &RecordId, record: &RecordRef) -> Option<Value> {
        let current = record.get(&relation.local_field);
        match relation.kind {
            RelationKind::BelongsTo => {
                let key = record.get(relation.local_key.as_deref()?)?;
                let found = RecordId::from_value(&key)
                    .ok()
                    .filter(|target| store.get(&relation.relation, target).is_some());
                Some(found.map_or(Value::Null, |target| target.to_value()))
            }
            RelationKind::HasOne => {
                let foreign_key = relation.foreign_key.as_deref()?;
                let found = store
                    .get_all(&relation.relation)
                    .iter()
                    .find(|candidate| points_at(candidate, foreign_key, id))
                    .and_then(|found| store.identity_of(&relation.relation, found));
                match (found, current) {
                    (Some(found), _) => Some(found.to_value()),
                    (None, Some(held)) if still_held(store, &relation.relation, foreign_key, id, &held) => {
                        Some(held)
                    }
                    (None, _) => Some(Value::Null),
                }
            }
            RelationKind::HasMany => {
                let foreign_key = relation.foreign_key.as_deref()?;
                let mut ids: Vec<Value> = match current {
                    Some(Value::Array(held)) => held
                        .into_iter()
                        .filter(|value| still_held(store, &relation.relation, foreign_key, id, value))
                        .collect(),
                    _ => Vec::new(),
                };
                for found in store
                    .get_all(&relation.relation)
                    .iter()
                    .filter(|candidate| points_at(candidate, foreign_key, id))
                    .filter_map(|found| store.identity_of(&relation.relation, found))
                {
                    if !ids.iter().any(|held| found.matches(held)) {
                        ids.push(found.to_value());
                    }
                }
                Some(Value::Array(ids))
            }
        }
    }
}

fn points_at(record: &RecordRef, field: &str, id: &RecordId) -> bool {
    record.get(field).is_some_and(|value| id.matches(&value))
}

/// `record`'s `field` names an owner other than `id`.
fn points_elsewhere(record: &RecordRef, field: &str, id: &RecordId) -> bool {
    record
        .get(field)
        .is_some_and(|value| !value.is_null() && !id.matches(&value))
}

/// A held relation value survives a relink unless it is an identity whose
/// record is gone or now belongs to another owner.
fn still_held(store: &DataStore, resource: &str, foreign_key: &str, owner: &RecordId, held: &Value) -> bool {
    let Ok(target) = RecordId::from_value(held) else {
        return !held.is_null();
    };
    store
        .get(resource, &target)
        .is_some_and(|related| !points_elsewhere(&related, foreign_key, owner))
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

impl Linker for ForeignKeyLinker {
    fn link(&self, store: &DataStore, resource: &str, id: &RecordId, relations: &[String]) {
        let (Some(definition), Some(record)) = (store.definition(resource), store.get(resource, id)) else {
            return;
        };
        for relation in definition
            .relations()
            .iter()
            .filter(|relation| relations.contains(&relation.relation))
        {
            let Some(value) = Self::find(store, relation, id, &record) else {
                continue;
            };
            match record.get(&relation.local_field) {
                Some(current) if current == value => continue,
                None if is_unset(&value) => continue,
                _ => {}
            }
            debug!(resource, %id, field = %relation.local_field, %value, "linked");
            record.set(relation.local_field.clone(), value);
        }
    }

    fn link_inverse(&self, store: &DataStore, resource: &str, id: &RecordId) {
        let Some(record) = store.get(resource, id) else {
            return;
        };
        for (owner, relation) in store.registry().referencing(resource) {
            for other in store.get_all(owner.name()) {
                let Some(other_id) = store.identity_of(owner.name(), &other) else {
                    continue;
                };
                match relation.kind {
                    RelationKind::BelongsTo => {
                        let Some(key) = relation.local_key.as_deref() else {
                            continue;
                        };
                        if points_at(&other, key, id) {
                            other.set(relation.local_field.clone(), id.to_value());
                        }
                    }
                    RelationKind::HasOne => {
                        let Some(foreign_key) = relation.foreign_key.as_deref() else {
                            continue;
                        };
                        let held = other
                            .get(&relation.local_field)
                            .is_some_and(|value| id.matches(&value));
                        if points_at(&record, foreign_key, &other_id) {
                            other.set(relation.local_field.clone(), id.to_value());
                        } else if held && points_elsewhere(&record, foreign_key, &other_id) {
                            other.set(relation.local_field.clone(), Value::Null);
                        }
                    }
                    RelationKind::HasMany => {
                        let Some(foreign_key) = relation.foreign_key.as_deref() else {
                            continue;
                        };
                        let points = points_at(&record, foreign_key, &other_id);
                        let mut ids = match other.get(&relation.local_field) {
                            Some(Value::Array(ids)) => ids,
                            _ if points => Vec::new(),
                            _ => continue,
                        };
                        let held = ids.iter().any(|existing| id.matches(existing));
                        if points {
                            if !held {
                                ids.push(id.to_value());
                                other.set(relation.local_field.clone(), Value::Array(ids));
                            }
                        } else if held && points_elsewhere(&record, foreign_key, &other_id) {
                            ids.retain(|existing| !id.matches(existing));
                            other.set(relation.local_field.clone(), Value::Array(ids));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::definition::ResourceDefinition;
    use crate::options::InjectOptions;
    use serde_json::json;

    fn store() -> DataStore {
        let mut store = DataStore::new(StoreConfig::deterministic());
        store
            .define(ResourceDefinition::new("user").relation(RelationDef::has_one(
                "profile", "profile", "user_id",
            )))
            .unwrap();
        store.define(ResourceDefinition::new("profile")).unwrap();
        store
            .define(
                ResourceDefinition::new("post")
                    .relation(RelationDef::belongs_to("user", "author", "author_id"))
                    .relation(RelationDef::has_many("comment", "comments", "post_id")),
            )
            .unwrap();
        store.define(ResourceDefinition::new("comment")).unwrap();
        store
    }

    fn put(store: &mut DataStore, name: &str, attrs: Value) -> RecordRef {
        store
            .inject(name, attrs, &InjectOptions::new())
            .unwrap()
            .one()
            .unwrap()
    }

    #[test]
    fn belongs_to_links_through_local_key() {
        let mut store = store();
        put(&mut store, "user", json!({"id": 9}));
        let post = put(&mut store, "post", json!({"id": 1, "author_id": 9}));
        assert_eq!(post.get("author"), Some(json!(9)));
    }

    #[test]
    fn belongs_to_without_target_is_left_alone() {
        let mut store = store();
        let post = put(&mut store, "post", json!({"id": 1, "author_id": 9}));
        assert_eq!(post.get("author"), None);
    }

    #[test]
    fn belongs_to_key_moving_to_missing_target_clears_the_link() {
        let mut store = store();
        put(&mut store, "user", json!({"id": 9}));
        let post = put(&mut store, "post", json!({"id": 1, "author_id": 9}));

        put(&mut store, "post", json!({"id": 1, "author_id": 10}));
        assert_eq!(post.get("author"), Some(Value::Null));

        put(&mut store, "post", json!({"id": 1, "author_id": null}));
        assert_eq!(post.get("author"), Some(Value::Null));

        put(&mut store, "post", json!({"id": 1, "author_id": 9}));
        assert_eq!(post.get("author"), Some(json!(9)));
    }

    #[test]
    fn relink_keeps_unresolved_nested_payload() {
        let mut store = store();
        let post = put(&mut store, "post", json!({"id": 1, "author": {"name": "anon"}}));
        assert_eq!(post.get("author"), Some(json!({"name": "anon"})));

        store.linker.link(&store, "post", &RecordId::Int(1), &["user".to_owned()]);
        assert_eq!(post.get("author"), Some(json!({"name": "anon"})));
    }

    #[test]
    fn inverse_belongs_to_links_existing_owners() {
        let mut store = store();
        let post = put(&mut store, "post", json!({"id": 1, "author_id": 9}));
        put(&mut store, "user", json!({"id": 9}));
        assert_eq!(post.get("author"), Some(json!(9)));
    }

    #[test]
    fn has_many_collects_in_insertion_order() {
        let mut store = store();
        store
            .inject(
                "comment",
                json!([{"id": 2, "post_id": 1}, {"id": 1, "post_id": 1}, {"id": 3, "post_id": 2}]),
                &InjectOptions::new(),
            )
            .unwrap();
        let post = put(&mut store, "post", json!({"id": 1}));
        assert_eq!(post.get("comments"), Some(json!([2, 1])));
    }

    #[test]
    fn inverse_has_many_appends_once() {
        let mut store = store();
        let post = put(&mut store, "post", json!({"id": 1}));
        assert_eq!(post.get("comments"), None);

        put(&mut store, "comment", json!({"id": 5, "post_id": 1}));
        put(&mut store, "comment", json!({"id": 6, "post_id": 1}));
        put(&mut store, "comment", json!({"id": 5, "body": "edited"}));
        assert_eq!(post.get("comments"), Some(json!([5, 6])));
    }

    #[test]
    fn has_many_drops_comment_moved_to_another_owner() {
        let mut store = store();
        let first = put(&mut store, "post", json!({"id": 1}));
        let second = put(&mut store, "post", json!({"id": 2}));
        put(&mut store, "comment", json!({"id": 5, "post_id": 1}));
        put(&mut store, "comment", json!({"id": 6, "post_id": 1}));
        assert_eq!(first.get("comments"), Some(json!([5, 6])));

        put(&mut store, "comment", json!({"id": 5, "post_id": 2}));
        assert_eq!(first.get("comments"), Some(json!([6])));
        assert_eq!(second.get("comments"), Some(json!([5])));

        put(&mut store, "comment", json!({"id": 6, "post_id": 2}));
        put(&mut store, "post", json!({"id": 1, "title": "empty"}));
        assert_eq!(first.get("comments"), Some(json!([])));
        assert_eq!(second.get("comments"), Some(json!([5, 6])));
    }

    #[test]
    fn has_one_is_cleared_when_profile_moves_away() {
        let mut store = store();
        let user = put(&mut store, "user", json!({"id": 9}));
        put(&mut store, "user", json!({"id": 10}));
        put(&mut store, "profile", json!({"id": "p1", "user_id": 9}));
        assert_eq!(user.get("profile"), Some(json!("p1")));

        put(&mut store, "profile", json!({"id": "p1", "user_id": 10}));
        assert_eq!(user.get("profile"), Some(Value::Null));
        assert_eq!(
            store.get("user", &RecordId::Int(10)).unwrap().get("profile"),
            Some(json!("p1"))
        );
    }

    #[test]
    fn has_one_links_both_directions() {
        let mut store = store();
        put(&mut store, "profile", json!({"id": "p1", "user_id": 9}));
        let user = put(&mut store, "user", json!({"id": 9}));
        assert_eq!(user.get("profile"), Some(json!("p1")));

        let other = put(&mut store, "user", json!({"id": 10}));
        put(&mut store, "profile", json!({"id": "p2", "user_id": 10}));
        assert_eq!(other.get("profile"), Some(json!("p2")));
    }

    #[test]
    fn noop_linker_links_nothing() {
        let mut store = store().with_linker(Box::new(NoopLinker));
        put(&mut store, "user", json!({"id": 9}));
        let post = put(&mut store, "post", json!({"id": 1, "author_id": 9}));
        put(&mut store, "comment", json!({"id": 5, "post_id": 1}));
        assert_eq!(post.get("author"), None);
        assert_eq!(post.get("comments"), None);
    }

    #[test]
    fn disabled_discovery_skips_forward_links() {
        let mut store = store();
        put(&mut store, "user", json!({"id": 9}));
        let post = store
            .inject(
                "post",
                json!({"id": 1, "author_id": 9}),
                &InjectOptions::new().find_belongs_to(false),
            )
            .unwrap()
            .one()
            .unwrap();
        assert_eq!(post.get("author"), None);
    }
}
