//! Field-level diff between two snapshots of a record.
//!
//! Fields present only in the new snapshot are `added`, fields present only
//! in the old one are `removed`, and fields present in both with different
//! values are `changed` (holding the new value).

use serde::Serialize;

use recstore_types::Attributes;

/// The result of comparing two attribute snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldDiff {
    /// Fields that did not exist before, with their new values.
    pub added: Attributes,
    /// Fields that no longer exist, with their last values.
    pub removed: Attributes,
    /// Fields whose value changed, with their new values.
    pub changed: Attributes,
}

impl FieldDiff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing was added, removed or changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of touched fields.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    /// Returns `true` if `field` appears in any of the three maps.
    pub fn touches(&self, field: &str) -> bool {
        self.added.contains_key(field)
            || self.removed.contains_key(field)
            || self.changed.contains_key(field)
    }

    /// Returns `true` if any of `fields` appears in the diff.
    pub fn touches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields.into_iter().any(|field| self.touches(field))
    }

    /// Drop `fields` from all three maps.
    pub fn strip<'a, I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            self.added.remove(field);
            self.removed.remove(field);
            self.changed.remove(field);
        }
    }
}

/// Compute the diff from `old` to `new`.
pub fn diff_attributes(old: &Attributes, new: &Attributes) -> FieldDiff {
    let mut diff = FieldDiff::new();

    for (key, old_val) in old {
        match new.get(key) {
            Some(new_val) => {
                if old_val != new_val {
                    diff.changed.insert(key.clone(), new_val.clone());
                }
            }
            None => {
                diff.removed.insert(key.clone(), old_val.clone());
            }
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            diff.added.insert(key.clone(), new_val.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn make_attrs(value: Value) -> Attributes {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn identical_snapshots_no_diff() {
        let state = make_attrs(json!({"a": 1, "b": "hello"}));
        let diff = diff_attributes(&state, &state);
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn empty_to_populated() {
        let diff = diff_attributes(&Attributes::new(), &make_attrs(json!({"x": 42, "y": "new"})));
        assert_eq!(diff.added.len(), 2);
        assert!(diff.removed.is_empty());
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn populated_to_empty_keeps_last_value() {
        let diff = diff_attributes(&make_attrs(json!({"x": 42})), &Attributes::new());
        assert_eq!(diff.removed.get("x"), Some(&json!(42)));
    }

    #[test]
    fn single_field_change() {
        let diff = diff_attributes(&make_attrs(json!({"a": 1})), &make_attrs(json!({"a": 2})));
        assert_eq!(diff.changed.get("a"), Some(&json!(2)));
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn mixed_changes() {
        let old = make_attrs(json!({"keep": true, "modify": "old", "remove": 42}));
        let new = make_attrs(json!({"keep": true, "modify": "new", "added": [1, 2, 3]}));

        let diff = diff_attributes(&old, &new);
        assert_eq!(diff.len(), 3);
        assert!(diff.touches("modify"));
        assert!(diff.touches("remove"));
        assert!(diff.touches("added"));
        assert!(!diff.touches("keep"));
    }

    #[test]
    fn nested_value_change_is_a_field_change() {
        let old = make_attrs(json!({"config": {"debug": false, "port": 8080}}));
        let new = make_attrs(json!({"config": {"debug": true, "port": 8080}}));
        let diff = diff_attributes(&old, &new);
        assert_eq!(diff.changed.len(), 1);
        assert!(diff.touches("config"));
    }

    #[test]
    fn strip_removes_fields_everywhere() {
        let old = make_attrs(json!({"author": 1, "gone": 1, "a": 1}));
        let new = make_attrs(json!({"author": {"id": 9}, "comments": [1], "a": 2}));
        let mut diff = diff_attributes(&old, &new);
        diff.strip(["author", "comments", "gone"]);
        assert_eq!(diff.len(), 1);
        assert!(diff.touches("a"));
    }

    #[test]
    fn touches_any_checks_each_field() {
        let diff = diff_attributes(&make_attrs(json!({"a": 1})), &make_attrs(json!({"a": 1, "b": 2})));
        assert!(diff.touches_any(["x", "b"]));
        assert!(!diff.touches_any(["x", "a"]));
    }
}
