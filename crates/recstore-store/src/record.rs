use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use recstore_types::{deep_merge, Attributes};

/// Shared handle to a record owned by a [`ResourceTable`](crate::ResourceTable).
///
/// Cloning the handle does not copy the record: every clone sees merges
/// applied by later injections. Mutations made through a handle are picked
/// up by the record's observer on the next delivery.
#[derive(Clone)]
pub struct RecordRef {
    inner: Arc<RwLock<Attributes>>,
}

impl RecordRef {
    /// Wrap attributes in a new handle.
    pub fn new(attrs: Attributes) -> Self {
        Self {
            inner: Arc::new(RwLock::new(attrs)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Attributes> {
        self.inner.read().expect("lock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Attributes> {
        self.inner.write().expect("lock poisoned")
    }

    /// Clone of a single field value.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.read().get(field).cloned()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.read().contains_key(field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.write().insert(field.into(), value)
    }

    pub fn remove(&self, field: &str) -> Option<Value> {
        self.write().remove(field)
    }

    /// Deep-merge `attrs` into the record in place.
    pub fn merge(&self, attrs: &Attributes) {
        deep_merge(&mut self.write(), attrs);
    }

    /// Deep copy of the current attributes.
    pub fn snapshot(&self) -> Attributes {
        self.read().clone()
    }

    /// The record as a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.snapshot())
    }

    /// Returns `true` if both handles point at the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&*self.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_attrs(value: Value) -> Attributes {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn clones_share_the_record() {
        let a = RecordRef::new(make_attrs(json!({"id": 1})));
        let b = a.clone();
        b.set("name", json!("x"));
        assert_eq!(a.get("name"), Some(json!("x")));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn distinct_records_are_not_ptr_eq() {
        let a = RecordRef::new(Attributes::new());
        let b = RecordRef::new(Attributes::new());
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn merge_is_deep() {
        let record = RecordRef::new(make_attrs(json!({"id": 1, "meta": {"a": 1}})));
        record.merge(&make_attrs(json!({"meta": {"b": 2}})));
        assert_eq!(record.get("meta"), Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn snapshot_is_detached() {
        let record = RecordRef::new(make_attrs(json!({"a": 1})));
        let snap = record.snapshot();
        record.set("a", json!(2));
        assert_eq!(snap["a"], json!(1));
        assert_eq!(record.to_value(), json!({"a": 2}));
    }

    #[test]
    fn remove_and_contains() {
        let record = RecordRef::new(make_attrs(json!({"a": 1})));
        assert!(record.contains("a"));
        assert_eq!(record.remove("a"), Some(json!(1)));
        assert!(!record.contains("a"));
    }
}
