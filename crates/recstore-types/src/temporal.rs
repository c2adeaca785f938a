use std::fmt;

use serde::{Deserialize, Serialize};

/// Mutation timestamp.
///
/// Combines a physical wall-clock component with a logical counter so that
/// two stamps taken within the same millisecond still compare strictly.
/// Clocks that do not track wall time leave `physical_ms` at zero and count
/// in `logical` only.
///
/// Ordered by `physical_ms`, then `logical`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Wall-clock milliseconds since UNIX epoch.
    pub physical_ms: u64,
    /// Logical counter for stamps at the same physical time.
    pub logical: u64,
}

impl Timestamp {
    /// Create a new timestamp with explicit values.
    pub const fn new(physical_ms: u64, logical: u64) -> Self {
        Self {
            physical_ms,
            logical,
        }
    }

    /// The zero timestamp, earlier than anything a clock returns.
    pub const fn zero() -> Self {
        Self {
            physical_ms: 0,
            logical: 0,
        }
    }

    /// Returns `true` if this timestamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.physical_ms
            .cmp(&other.physical_ms)
            .then(self.logical.cmp(&other.logical))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms.{})", self.physical_ms, self.logical)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.physical_ms, self.logical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_physical_first() {
        let a = Timestamp::new(100, 5);
        let b = Timestamp::new(200, 0);
        assert!(a < b);
        assert!(b.is_after(&a));
    }

    #[test]
    fn ordering_logical_second() {
        let a = Timestamp::new(100, 1);
        let b = Timestamp::new(100, 2);
        assert!(a < b);
    }

    #[test]
    fn zero_is_smallest() {
        assert!(Timestamp::zero() < Timestamp::new(0, 1));
        assert_eq!(Timestamp::default(), Timestamp::zero());
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", Timestamp::new(1000, 5)), "1000.5");
    }
}
