use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use recstore_types::Attributes;

use crate::options::InjectOptions;
use crate::store::Injected;

/// Kind of association between two resource types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
        })
    }
}

/// A declared relation from one resource type to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Name of the related resource type.
    pub relation: String,
    pub kind: RelationKind,
    /// Field holding the related identity (or identities).
    pub local_field: String,
    /// Field on this record holding the related identity (belongsTo).
    #[serde(default)]
    pub local_key: Option<String>,
    /// Field on the related records pointing back at this one
    /// (hasOne / hasMany).
    #[serde(default)]
    pub foreign_key: Option<String>,
}

impl RelationDef {
    pub fn belongs_to(
        relation: impl Into<String>,
        local_field: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            kind: RelationKind::BelongsTo,
            local_field: local_field.into(),
            local_key: Some(local_key.into()),
            foreign_key: None,
        }
    }

    pub fn has_one(
        relation: impl Into<String>,
        local_field: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            kind: RelationKind::HasOne,
            local_field: local_field.into(),
            local_key: None,
            foreign_key: Some(foreign_key.into()),
        }
    }

    pub fn has_many(
        relation: impl Into<String>,
        local_field: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            kind: RelationKind::HasMany,
            local_field: local_field.into(),
            local_key: None,
            foreign_key: Some(foreign_key.into()),
        }
    }
}

/// Pure function computing a derived field.
///
/// Receives the record's attributes as context and the dependency values in
/// declared order (`null` for missing dependencies). It must not depend on
/// anything but its inputs.
pub type ComputeFn = Arc<dyn Fn(&Attributes, &[Value]) -> Value + Send + Sync>;

/// A derived field and the fields it is derived from.
#[derive(Clone)]
pub struct ComputedField {
    pub field: String,
    pub deps: Vec<String>,
    func: ComputeFn,
}

impl ComputedField {
    pub fn new<I, S, F>(field: impl Into<String>, deps: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Attributes, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            field: field.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    /// Evaluate against `context` without writing anything.
    pub fn evaluate(&self, context: &Attributes) -> Value {
        let args: Vec<Value> = self
            .deps
            .iter()
            .map(|dep| context.get(dep).cloned().unwrap_or(Value::Null))
            .collect();
        (self.func)(context, &args)
    }

    pub fn depends_on(&self, field: &str) -> bool {
        self.deps.iter().any(|dep| dep == field)
    }
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("field", &self.field)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// Type-specific record constructor used when `use_class` is set.
pub trait RecordClass: Send + Sync {
    fn name(&self) -> &str;

    /// Fresh record carrying the class defaults.
    fn construct(&self) -> Attributes;

    /// Whether `attrs` already has the constructed shape and can be adopted
    /// as the record without copying.
    fn is_instance(&self, attrs: &Attributes) -> bool;
}

/// Per-resource lifecycle callbacks, invoked when `notify` is set.
pub trait LifecycleHooks: Send + Sync {
    fn before_inject(&self, _resource: &str, _attrs: &Value) {}

    fn after_inject(&self, _resource: &str, _injected: &Injected) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl LifecycleHooks for NoHooks {}

/// Everything the injection pipeline knows about one resource type.
#[derive(Clone)]
pub struct ResourceDefinition {
    name: String,
    id_attribute: String,
    relations: Vec<RelationDef>,
    computed: Vec<ComputedField>,
    defaults: InjectOptions,
    class: Option<Arc<dyn RecordClass>>,
    hooks: Arc<dyn LifecycleHooks>,
}

impl ResourceDefinition {
    /// A definition with identity field `id` and no relations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_attribute: "id".into(),
            relations: Vec::new(),
            computed: Vec::new(),
            defaults: InjectOptions::default(),
            class: None,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn id_attribute(mut self, field: impl Into<String>) -> Self {
        self.id_attribute = field.into();
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn computed(mut self, computed: ComputedField) -> Self {
        self.computed.push(computed);
        self
    }

    pub fn keep_change_history(mut self, value: bool) -> Self {
        self.defaults.keep_change_history = Some(value);
        self
    }

    pub fn reset_history_on_inject(mut self, value: bool) -> Self {
        self.defaults.reset_history_on_inject = Some(value);
        self
    }

    /// Definition-level option overrides.
    pub fn options(mut self, options: InjectOptions) -> Self {
        self.defaults = options;
        self
    }

    pub fn class(mut self, class: Arc<dyn RecordClass>) -> Self {
        self.class = Some(class);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_field(&self) -> &str {
        &self.id_attribute
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Local fields of every relation. These are structural, never data.
    pub fn relation_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.relations.iter().map(|r| r.local_field.as_str())
    }

    pub fn relation_for_field(&self, field: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.local_field == field)
    }

    pub fn computed_fields(&self) -> &[ComputedField] {
        &self.computed
    }

    pub fn computed_field(&self, field: &str) -> Option<&ComputedField> {
        self.computed.iter().find(|c| c.field == field)
    }

    pub fn defaults(&self) -> &InjectOptions {
        &self.defaults
    }

    pub fn record_class(&self) -> Option<&Arc<dyn RecordClass>> {
        self.class.as_ref()
    }

    pub fn lifecycle(&self) -> &dyn LifecycleHooks {
        self.hooks.as_ref()
    }

    /// Check the definition for shapes the pipeline cannot settle.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("resource name is empty".into());
        }
        if self.id_attribute.is_empty() {
            return Err("identity field name is empty".into());
        }

        let mut local_fields = HashSet::new();
        for relation in &self.relations {
            if !local_fields.insert(relation.local_field.as_str()) {
                return Err(format!(
                    "local field `{}` is used by more than one relation",
                    relation.local_field
                ));
            }
            if relation.local_field == self.id_attribute {
                return Err("the identity field cannot be a relation field".into());
            }
        }

        let mut computed_fields = HashSet::new();
        for computed in &self.computed {
            if !computed_fields.insert(computed.field.as_str()) {
                return Err(format!("computed field `{}` is declared twice", computed.field));
            }
            if computed.depends_on(&computed.field) {
                return Err(format!(
                    "computed field `{}` depends on itself",
                    computed.field
                ));
            }
            if local_fields.contains(computed.field.as_str()) {
                return Err(format!(
                    "computed field `{}` is also a relation field",
                    computed.field
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("relations", &self.relations)
            .field("computed", &self.computed)
            .field("defaults", &self.defaults)
            .field("class", &self.class.as_ref().map(|c| c.name().to_owned()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_name() -> ComputedField {
        ComputedField::new("full_name", ["first", "last"], |_, args| {
            json!(format!(
                "{} {}",
                args[0].as_str().unwrap_or_default(),
                args[1].as_str().unwrap_or_default()
            ))
        })
    }

    #[test]
    fn computed_evaluates_in_declared_order() {
        let attrs = json!({"first": "Ada", "last": "Lovelace"})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(full_name().evaluate(&attrs), json!("Ada Lovelace"));
    }

    #[test]
    fn missing_dependencies_are_null() {
        let seen = ComputedField::new("n", ["absent"], |_, args| json!(args[0].is_null()));
        assert_eq!(seen.evaluate(&Attributes::new()), json!(true));
    }

    #[test]
    fn relation_fields_lists_local_fields() {
        let def = ResourceDefinition::new("post")
            .relation(RelationDef::belongs_to("user", "author", "author_id"))
            .relation(RelationDef::has_many("comment", "comments", "post_id"));
        let fields: Vec<&str> = def.relation_fields().collect();
        assert_eq!(fields, vec!["author", "comments"]);
        assert_eq!(
            def.relation_for_field("comments").map(|r| r.kind),
            Some(RelationKind::HasMany)
        );
    }

    #[test]
    fn self_dependent_computed_field_is_invalid() {
        let def = ResourceDefinition::new("post")
            .computed(ComputedField::new("n", ["n"], |_, _| json!(1)));
        assert!(def.validate().unwrap_err().contains("depends on itself"));
    }

    #[test]
    fn duplicate_local_field_is_invalid() {
        let def = ResourceDefinition::new("post")
            .relation(RelationDef::belongs_to("user", "author", "author_id"))
            .relation(RelationDef::belongs_to("editor", "author", "editor_id"));
        assert!(def.validate().is_err());
    }

    #[test]
    fn empty_identity_field_is_invalid() {
        assert!(ResourceDefinition::new("post").id_attribute("").validate().is_err());
    }

    #[test]
    fn relation_kind_serde_and_display() {
        let kind: RelationKind = serde_json::from_str("\"has_many\"").unwrap();
        assert_eq!(kind, RelationKind::HasMany);
        assert_eq!(kind.to_string(), "hasMany");
    }
}
