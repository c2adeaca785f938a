use recstore_types::RecordId;

/// Errors from resource table operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with this identity exists in the table.
    #[error("{resource}: no record with id {id}")]
    UnknownRecord { resource: String, id: RecordId },

    /// A record with this identity already exists; merge instead.
    #[error("{resource}: record {id} already exists")]
    DuplicateRecord { resource: String, id: RecordId },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
