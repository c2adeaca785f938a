//! Injection scripts: a JSON array of steps replayed against a store.
//!
//! ```json
//! [
//!   {"op": "inject", "resource": "post", "data": {"id": 1, "title": "a"}},
//!   {"op": "inject", "resource": "post", "data": [{"id": 2}], "options": {"notify": false}},
//!   {"op": "digest"}
//! ]
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use recstore_inject::{ChangeRecord, DataStore, InjectOptions, Injected, Timestamp};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Inject {
        resource: String,
        data: Value,
        #[serde(default)]
        options: InjectOptions,
    },
    Digest,
}

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Records injected, or reactions run by a digest.
    pub affected: usize,
    /// Rejected batch elements and relation faults.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub name: String,
    pub collection_modified: Option<Timestamp>,
    pub records: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub resources: Vec<ResourceReport>,
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
}

/// Run `steps` in order, stopping at the first failed step.
pub fn run(store: &mut DataStore, steps: &[Step]) -> anyhow::Result<Vec<StepOutcome>> {
    let mut outcomes = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let mut outcome = match step {
            Step::Inject { resource, data, options } => {
                let injected = store
                    .inject(resource, data.clone(), options)
                    .with_context(|| format!("step {index}: inject into `{resource}`"))?;
                let faults = match &injected {
                    Injected::One(_) => Vec::new(),
                    Injected::Many(results) => results
                        .iter()
                        .enumerate()
                        .filter_map(|(position, result)| {
                            result.as_ref().err().map(|err| format!("element {position}: {err}"))
                        })
                        .collect(),
                };
                StepOutcome {
                    index,
                    op: "inject",
                    resource: Some(resource.clone()),
                    affected: injected.len(),
                    faults,
                }
            }
            Step::Digest => {
                let reactions = store
                    .digest()
                    .with_context(|| format!("step {index}: digest"))?;
                StepOutcome {
                    index,
                    op: "digest",
                    resource: None,
                    affected: reactions,
                    faults: Vec::new(),
                }
            }
        };

        outcome
            .faults
            .extend(store.take_faults().iter().map(ToString::to_string));
        debug!(index, op = outcome.op, affected = outcome.affected, "script step applied");
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Snapshot every resource of `store`, in definition order.
pub fn report(store: &DataStore, steps: Vec<StepOutcome>, with_history: bool) -> Report {
    let resources = store
        .registry()
        .names()
        .iter()
        .map(|name| ResourceReport {
            name: name.clone(),
            collection_modified: store.collection_modified(name),
            records: store.get_all(name).iter().map(|record| record.to_value()).collect(),
            history: if with_history {
                store.collection_history(name)
            } else {
                Vec::new()
            },
        })
        .collect();
    Report { steps, resources }
}
