use serde_json::{Map, Value};

/// Field name to value mapping backing a record.
pub type Attributes = Map<String, Value>;

/// Deep-merge `source` into `target`.
///
/// Nested objects merge key by key; scalars and arrays in `source`
/// overwrite whatever `target` holds for that key.
pub fn deep_merge(target: &mut Attributes, source: &Attributes) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                deep_merge(existing, nested);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Whether a field value counts as populated for relation handling.
///
/// `null`, `false` and the empty string are unpopulated. Numbers are always
/// populated, so an identity of `0` still links.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_objects_merge_key_by_key() {
        let mut target = attrs(json!({"a": 1, "meta": {"x": 1, "y": 2}}));
        let source = attrs(json!({"meta": {"y": 3, "z": 4}}));
        deep_merge(&mut target, &source);
        assert_eq!(
            Value::Object(target),
            json!({"a": 1, "meta": {"x": 1, "y": 3, "z": 4}})
        );
    }

    #[test]
    fn arrays_and_scalars_overwrite() {
        let mut target = attrs(json!({"tags": [1, 2, 3], "n": 1, "obj": {"k": 1}}));
        let source = attrs(json!({"tags": [9], "n": "one", "obj": 5}));
        deep_merge(&mut target, &source);
        assert_eq!(Value::Object(target), json!({"tags": [9], "n": "one", "obj": 5}));
    }

    #[test]
    fn object_replaces_scalar() {
        let mut target = attrs(json!({"author": 9}));
        let source = attrs(json!({"author": {"id": 9}}));
        deep_merge(&mut target, &source);
        assert_eq!(target["author"], json!({"id": 9}));
    }

    #[test]
    fn populated_values() {
        assert!(!is_populated(&json!(null)));
        assert!(!is_populated(&json!(false)));
        assert!(!is_populated(&json!("")));
        assert!(is_populated(&json!(0)));
        assert!(is_populated(&json!("x")));
        assert!(is_populated(&json!([])));
        assert!(is_populated(&json!({})));
    }

    proptest! {
        #[test]
        fn merge_with_self_is_identity(a in 0i64..100, b in "[a-z]{0,8}") {
            let original = attrs(json!({"a": a, "nested": {"b": b}}));
            let mut target = original.clone();
            deep_merge(&mut target, &original);
            prop_assert_eq!(target, original);
        }

        #[test]
        fn merged_keys_take_source_scalars(x in any::<i64>(), y in any::<i64>()) {
            let mut target = attrs(json!({"k": x, "keep": true}));
            let source = attrs(json!({"k": y}));
            deep_merge(&mut target, &source);
            prop_assert_eq!(&target["k"], &json!(y));
            prop_assert_eq!(&target["keep"], &json!(true));
        }
    }
}
