//! Resource tables for recstore.
//!
//! A [`ResourceTable`] exclusively owns every record of one resource type
//! together with the bookkeeping the injection pipeline needs: the snapshot
//! seeded at injection, per-record and type-wide mutation timestamps, the
//! change history and one [`Observer`](recstore_diff::Observer) per record.
//!
//! # Design Rules
//!
//! 1. Every identity in the index has a `modified` stamp, a history slot
//!    and an observer.
//! 2. `collection_modified` is never behind any per-record stamp.
//! 3. Change records live once in an arena; per-record and type-wide
//!    histories are index lists into it.
//! 4. Records are never evicted by this crate.

pub mod clock;
pub mod error;
pub mod history;
pub mod record;
pub mod table;

pub use clock::{Clock, CounterClock, HybridClock};
pub use error::{StoreError, StoreResult};
pub use history::{ChangeHistory, ChangeRecord, HistoryIndex};
pub use record::RecordRef;
pub use table::ResourceTable;
