//! Snapshot diff engine for recstore.
//!
//! Replaces a reflective dirty-checking runtime with an explicit, pure
//! comparison: an [`Observer`] keeps the last delivered snapshot of a record
//! and [`Observer::deliver`] reports the [`FieldDiff`] between that snapshot
//! and the record's current attributes.
//!
//! # Key Types
//!
//! - [`FieldDiff`] -- added / removed / changed field maps
//! - [`Observer`] -- per-record baseline with on-demand delivery

pub mod field_diff;
pub mod observer;

pub use field_diff::{diff_attributes, FieldDiff};
pub use observer::Observer;
