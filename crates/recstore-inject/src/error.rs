use serde_json::Value;

use recstore_store::StoreError;
use recstore_types::{RecordId, TypeError};

use crate::definition::RelationKind;

/// Errors produced by definition registration and record injection.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    /// No definition is registered under this name.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The payload is neither an object nor an array of objects.
    #[error("{resource}.inject: attrs must be an object or an array, got {found}")]
    InvalidPayload { resource: String, found: String },

    /// The payload lacks the identity field and it is not computed.
    #[error("{resource}.inject: attrs must contain the identity field `{field}`")]
    MissingIdentity { resource: String, field: String },

    /// The identity value is not a string or an integer.
    #[error("{resource}.inject: {source}")]
    InvalidIdentity {
        resource: String,
        #[source]
        source: TypeError,
    },

    /// A relation targets a resource with no registered definition.
    #[error("{resource}: relation `{relation}` is defined, but the resource is not")]
    RelationDefinitionMissing { resource: String, relation: String },

    /// Injecting a nested relation payload failed.
    #[error("{resource}: failed to inject {kind} relation `{relation}`: {source}")]
    NestedInjectionFailed {
        resource: String,
        relation: String,
        kind: RelationKind,
        #[source]
        source: Box<InjectError>,
    },

    /// A record's identity field changed after injection.
    #[error("{resource}: identity of record {id} changed to {new}; its table entries are now undefined")]
    IdentityMutated {
        resource: String,
        id: RecordId,
        new: Value,
    },

    /// Reactions kept producing changes past the configured bound.
    #[error("{resource}: record {id} did not settle within {rounds} reaction rounds")]
    ReactionLimitExceeded {
        resource: String,
        id: RecordId,
        rounds: usize,
    },

    /// The field is not the local field of any relation.
    #[error("{resource}: `{field}` is not a relation field")]
    UnknownRelation { resource: String, field: String },

    #[error("resource already defined: {0}")]
    DuplicateResource(String),

    #[error("{resource}: invalid definition: {reason}")]
    InvalidDefinition { resource: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for injection operations.
pub type InjectResult<T> = Result<T, InjectError>;
