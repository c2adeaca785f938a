use serde_json::Value;

use recstore_diff::FieldDiff;
use recstore_store::RecordRef;

use crate::definition::{ComputedField, ResourceDefinition};

/// Evaluate `computed` against `record` and write the result into it.
pub fn evaluate_into(record: &RecordRef, computed: &ComputedField) -> Value {
    let value = {
        let attrs = record.read();
        computed.evaluate(&attrs)
    };
    record.set(computed.field.clone(), value.clone());
    value
}

/// Whether `computed` must be recomputed after `diff`.
///
/// True when a dependency was touched, when there are no dependencies at
/// all, or when the record does not hold the field yet.
pub fn is_stale(computed: &ComputedField, record: &RecordRef, diff: &FieldDiff) -> bool {
    computed.deps.is_empty()
        || diff.touches_any(computed.deps.iter().map(String::as_str))
        || !record.contains(&computed.field)
}

/// Recompute every stale computed field of `definition`, in declared order.
///
/// Returns the names of the recomputed fields.
pub fn recompute(definition: &ResourceDefinition, record: &RecordRef, diff: &FieldDiff) -> Vec<String> {
    let mut recomputed = Vec::new();
    for computed in definition.computed_fields() {
        if is_stale(computed, record, diff) {
            evaluate_into(record, computed);
            recomputed.push(computed.field.clone());
        }
    }
    recomputed
}

#[cfg(test)]
mod tests {
    use super::*;
    use recstore_diff::diff_attributes;
    use recstore_types::Attributes;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    fn doubled() -> ComputedField {
        ComputedField::new("double", ["x"], |_, args| {
            json!(args[0].as_i64().unwrap_or_default() * 2)
        })
    }

    #[test]
    fn evaluate_into_writes_target() {
        let record = RecordRef::new(attrs(json!({"x": 4})));
        assert_eq!(evaluate_into(&record, &doubled()), json!(8));
        assert_eq!(record.get("double"), Some(json!(8)));
    }

    #[test]
    fn stale_when_dependency_touched() {
        let record = RecordRef::new(attrs(json!({"x": 2, "double": 4, "y": 1})));
        let diff = diff_attributes(&attrs(json!({"x": 1})), &attrs(json!({"x": 2})));
        assert!(is_stale(&doubled(), &record, &diff));
    }

    #[test]
    fn fresh_when_unrelated_field_touched() {
        let record = RecordRef::new(attrs(json!({"x": 2, "double": 4, "y": 2})));
        let diff = diff_attributes(&attrs(json!({"y": 1})), &attrs(json!({"y": 2})));
        assert!(!is_stale(&doubled(), &record, &diff));
    }

    #[test]
    fn stale_when_target_absent() {
        let record = RecordRef::new(attrs(json!({"x": 2})));
        assert!(is_stale(&doubled(), &record, &FieldDiff::new()));
    }

    #[test]
    fn no_dependencies_is_always_stale() {
        let constant = ComputedField::new("k", Vec::<String>::new(), |_, _| json!(1));
        let record = RecordRef::new(attrs(json!({"k": 1})));
        assert!(is_stale(&constant, &record, &FieldDiff::new()));
    }

    #[test]
    fn recompute_follows_declared_order() {
        let def = ResourceDefinition::new("n")
            .computed(doubled())
            .computed(ComputedField::new("quad", ["double"], |_, args| {
                json!(args[0].as_i64().unwrap_or_default() * 2)
            }));
        let record = RecordRef::new(attrs(json!({"x": 3})));
        let recomputed = recompute(&def, &record, &FieldDiff::new());
        assert_eq!(recomputed, vec!["double".to_owned(), "quad".to_owned()]);
        assert_eq!(record.get("quad"), Some(json!(12)));
    }
}
