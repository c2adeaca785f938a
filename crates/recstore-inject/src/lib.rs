//! Record injection and change tracking for recstore.
//!
//! [`DataStore::inject`] is the entry point. For every payload it:
//!
//! 1. resolves the identity ([`identity`]), computing it when the identity
//!    field is a computed field;
//! 2. creates the record or deep-merges into the existing one;
//! 3. reacts to the resulting diff ([`reactor`]): timestamps, change
//!    history, computed fields ([`computed`]) and relation re-linking;
//! 4. injects nested relation payloads and replaces them with identities;
//! 5. flushes the record's observer until it settles;
//! 6. runs forward and inverse link discovery ([`linker`]) and notifies
//!    lifecycle hooks and the event sink.
//!
//! # Fault Policy
//!
//! - Unknown resources, malformed payloads and missing identities fail the
//!   call (or the batch element) that raised them.
//! - Relation faults are logged and kept for [`DataStore::take_faults`];
//!   the host record is still injected.
//! - Identity mutations and runaway reactions are returned as errors after
//!   the offending reaction completes. Nothing is rolled back.

pub mod computed;
pub mod config;
pub mod definition;
pub mod error;
pub mod events;
pub mod identity;
pub mod linker;
pub mod options;
pub mod reactor;
pub mod registry;
pub mod relations;
pub mod store;

pub use config::{ClockKind, StoreConfig};
pub use definition::{
    ComputeFn, ComputedField, LifecycleHooks, NoHooks, RecordClass, RelationDef, RelationKind,
    ResourceDefinition,
};
pub use error::{InjectError, InjectResult};
pub use events::{EventSink, TracingSink};
pub use linker::{ForeignKeyLinker, Linker, NoopLinker};
pub use options::{InjectOptions, ResolvedOptions};
pub use registry::DefinitionRegistry;
pub use relations::Related;
pub use store::{DataStore, Injected};

pub use recstore_store::{ChangeRecord, RecordRef};
pub use recstore_types::{Attributes, RecordId, Timestamp};
