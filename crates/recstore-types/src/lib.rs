//! Foundation types for recstore.
//!
//! Every other recstore crate depends on `recstore-types`.
//!
//! # Key Types
//!
//! - [`RecordId`]: Identity value of a record within its resource type
//! - [`Timestamp`]: Monotonic mutation timestamp (physical + logical)
//! - [`Attributes`]: Field name to JSON value mapping that backs a record

pub mod error;
pub mod identity;
pub mod temporal;
pub mod value;

pub use error::TypeError;
pub use identity::RecordId;
pub use temporal::Timestamp;
pub use value::{deep_merge, is_populated, Attributes};
