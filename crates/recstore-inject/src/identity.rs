use serde_json::Value;

use recstore_types::{Attributes, RecordId};

use crate::definition::ResourceDefinition;
use crate::error::{InjectError, InjectResult};

/// Determine the identity of an incoming payload.
///
/// When the identity field is itself a computed field it is evaluated over
/// the raw payload (never an existing record) and written into `attrs`
/// first. Nothing outside `attrs` is touched, so a failure leaves the store
/// as it was.
pub fn resolve_identity(
    definition: &ResourceDefinition,
    attrs: &mut Attributes,
) -> InjectResult<RecordId> {
    let field = definition.id_field();
    if let Some(computed) = definition.computed_field(field) {
        let value = computed.evaluate(attrs);
        attrs.insert(field.to_owned(), value);
    }

    match attrs.get(field) {
        None | Some(Value::Null) => Err(InjectError::MissingIdentity {
            resource: definition.name().to_owned(),
            field: field.to_owned(),
        }),
        Some(value) => RecordId::from_value(value).map_err(|source| InjectError::InvalidIdentity {
            resource: definition.name().to_owned(),
            source,
        }),
    }
}
