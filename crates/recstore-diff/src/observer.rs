use recstore_types::Attributes;

use crate::field_diff::{diff_attributes, FieldDiff};

/// Change observer for a single record.
///
/// Holds the snapshot of the record as of the last delivery. Nothing is
/// trapped or polled: callers hand the record's current attributes to
/// [`Observer::deliver`] whenever they want pending changes reconciled.
#[derive(Clone, Debug)]
pub struct Observer {
    baseline: Attributes,
}

impl Observer {
    /// Open an observer whose baseline is `baseline`.
    pub fn open(baseline: Attributes) -> Self {
        Self { baseline }
    }

    /// Report changes since the last delivery and advance the baseline.
    ///
    /// Returns `None` when nothing changed.
    pub fn deliver(&mut self, current: &Attributes) -> Option<FieldDiff> {
        let diff = diff_attributes(&self.baseline, current);
        if diff.is_empty() {
            return None;
        }
        self.baseline = current.clone();
        Some(diff)
    }
}
