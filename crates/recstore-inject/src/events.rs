use tracing::debug;

use crate::definition::ResourceDefinition;
use crate::store::Injected;

/// Receiver of store notifications for outside subscribers.
pub trait EventSink: Send + Sync {
    fn emit(&self, definition: &ResourceDefinition, event: &str, payload: &Injected);
}

/// Sink that only logs emitted events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, definition: &ResourceDefinition, event: &str, payload: &Injected) {
        debug!(
            resource = definition.name(),
            event,
            records = payload.len(),
            "event emitted"
        );
    }
}
