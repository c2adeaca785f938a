//! TOML schema files: store configuration plus resource definitions.
//!
//! ```toml
//! [store]
//! clock = "counter"
//!
//! [[resource]]
//! name = "post"
//! keep_change_history = true
//!
//! [[resource.relation]]
//! kind = "belongs_to"
//! relation = "user"
//! local_field = "author"
//! local_key = "author_id"
//!
//! [[resource.computed]]
//! field = "label"
//! op = "concat"
//! deps = ["title", "id"]
//! separator = "#"
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::{Number, Value};

use recstore_inject::{
    ComputedField, DataStore, InjectOptions, RelationDef, RelationKind, ResourceDefinition,
    StoreConfig,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schema {
    pub store: StoreConfig,
    #[serde(rename = "resource")]
    pub resources: Vec<ResourceSchema>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSchema {
    pub name: String,
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,
    #[serde(default)]
    pub keep_change_history: Option<bool>,
    #[serde(default)]
    pub reset_history_on_inject: Option<bool>,
    #[serde(default)]
    pub options: InjectOptions,
    #[serde(default, rename = "relation")]
    pub relations: Vec<RelationDef>,
    #[serde(default)]
    pub computed: Vec<ComputedSchema>,
}

fn default_id_attribute() -> String {
    "id".into()
}

/// Builtin derivations available to schema files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputedOp {
    /// Join the populated dependencies as text.
    Concat,
    /// Add up the numeric dependencies.
    Sum,
    /// Mirror a single dependency.
    Copy,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputedSchema {
    pub field: String,
    pub op: ComputedOp,
    pub deps: Vec<String>,
    #[serde(default)]
    pub separator: Option<String>,
}

impl Schema {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading schema {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing schema {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Register every resource in a fresh store.
    pub fn build_store(&self) -> anyhow::Result<DataStore> {
        let mut store = DataStore::new(self.store.clone());
        for resource in &self.resources {
            let definition = resource
                .to_definition()
                .with_context(|| format!("resource `{}`", resource.name))?;
            store
                .define(definition)
                .with_context(|| format!("defining resource `{}`", resource.name))?;
        }
        Ok(store)
    }

    /// Relation targets no resource in this schema defines, as
    /// `(resource, target)` pairs.
    pub fn dangling_relations(&self) -> Vec<(String, String)> {
        self.resources
            .iter()
            .flat_map(|resource| {
                resource
                    .relations
                    .iter()
                    .filter(|relation| !self.resources.iter().any(|r| r.name == relation.relation))
                    .map(|relation| (resource.name.clone(), relation.relation.clone()))
            })
            .collect()
    }
}

impl ResourceSchema {
    pub fn to_definition(&self) -> anyhow::Result<ResourceDefinition> {
        let mut definition = ResourceDefinition::new(&self.name)
            .id_attribute(&self.id_attribute)
            .options(self.options.clone());
        if let Some(keep) = self.keep_change_history {
            definition = definition.keep_change_history(keep);
        }
        if let Some(reset) = self.reset_history_on_inject {
            definition = definition.reset_history_on_inject(reset);
        }

        for relation in &self.relations {
            match relation.kind {
                RelationKind::BelongsTo if relation.local_key.is_none() => {
                    bail!("belongs_to relation `{}` needs a local_key", relation.local_field)
                }
                RelationKind::HasOne | RelationKind::HasMany if relation.foreign_key.is_none() => {
                    bail!(
                        "{} relation `{}` needs a foreign_key",
                        relation.kind,
                        relation.local_field
                    )
                }
                _ => {}
            }
            definition = definition.relation(relation.clone());
        }

        for computed in &self.computed {
            definition = definition.computed(computed.to_field()?);
        }
        Ok(definition)
    }
}

impl ComputedSchema {
    pub fn to_field(&self) -> anyhow::Result<ComputedField> {
        if self.deps.is_empty() {
            bail!("computed field `{}` has no dependencies", self.field);
        }
        if self.op == ComputedOp::Copy && self.deps.len() != 1 {
            bail!("computed field `{}`: copy takes exactly one dependency", self.field);
        }
        if self.op != ComputedOp::Concat && self.separator.is_some() {
            bail!("computed field `{}`: separator only applies to concat", self.field);
        }

        let deps = self.deps.clone();
        let field = match self.op {
            ComputedOp::Concat => {
                let separator = self.separator.clone().unwrap_or_default();
                ComputedField::new(&self.field, deps, move |_, args| concat(args, &separator))
            }
            ComputedOp::Sum => ComputedField::new(&self.field, deps, |_, args| sum(args)),
            ComputedOp::Copy => ComputedField::new(&self.field, deps, |_, args| {
                args.first().cloned().unwrap_or(Value::Null)
            }),
        };
        Ok(field)
    }
}

fn concat(args: &[Value], separator: &str) -> Value {
    let parts: Vec<String> = args
        .iter()
        .filter(|value| !value.is_null())
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect();
    if parts.is_empty() {
        return Value::Null;
    }
    Value::String(parts.join(separator))
}

fn sum(args: &[Value]) -> Value {
    let numbers: Vec<&Number> = args.iter().filter_map(Value::as_number).collect();
    let integral: Option<i64> = numbers
        .iter()
        .try_fold(0i64, |total, n| n.as_i64().and_then(|n| total.checked_add(n)));
    match integral {
        Some(total) => Value::from(total),
        None => Number::from_f64(numbers.iter().filter_map(|n| n.as_f64()).sum())
            .map_or(Value::Null, Value::Number),
    }
}
