use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use recstore_types::Timestamp;

/// Source of mutation timestamps.
///
/// Every call to [`Clock::now`] must return a value strictly greater than
/// any value previously returned by the same clock, so two mutations in the
/// same millisecond never share a stamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

struct HybridState {
    physical_ms: u64,
    logical: u64,
}

/// Wall-clock time with a logical tie-breaker.
///
/// - `physical = max(wall_clock, state.physical)`.
/// - If physical advanced, `logical = 0`; otherwise `logical += 1`.
pub struct HybridClock {
    state: Mutex<HybridState>,
}

impl HybridClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HybridState {
                physical_ms: 0,
                logical: 0,
            }),
        }
    }

    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HybridClock {
    fn now(&self) -> Timestamp {
        let wall = Self::wall_clock_ms();
        let mut state = self.state.lock().expect("clock mutex poisoned");

        let new_physical = wall.max(state.physical_ms);
        let new_logical = if new_physical > state.physical_ms {
            0
        } else {
            state.logical + 1
        };

        state.physical_ms = new_physical;
        state.logical = new_logical;

        Timestamp::new(new_physical, new_logical)
    }
}

/// Pure counter clock. Deterministic, starts at logical 1.
#[derive(Debug, Default)]
pub struct CounterClock {
    next: AtomicU64,
}

impl CounterClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for CounterClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(0, self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hybrid_is_monotonic_across_rapid_calls() {
        let clock = HybridClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev, "clock must be strictly monotonic: {prev:?} >= {next:?}");
            prev = next;
        }
    }

    #[test]
    fn hybrid_logical_increments_within_same_physical() {
        let clock = HybridClock::new();
        {
            let mut state = clock.state.lock().unwrap();
            state.physical_ms = u64::MAX;
            state.logical = 0;
        }
        let t1 = clock.now();
        let t2 = clock.now();
        assert_eq!(t1, Timestamp::new(u64::MAX, 1));
        assert_eq!(t2, Timestamp::new(u64::MAX, 2));
    }

    #[test]
    fn counter_starts_at_one() {
        let clock = CounterClock::new();
        assert_eq!(clock.now(), Timestamp::new(0, 1));
        assert_eq!(clock.now(), Timestamp::new(0, 2));
    }

    #[test]
    fn concurrent_calls_are_unique() {
        use std::sync::Arc;
        use std::thread;

        let clock = Arc::new(HybridClock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || (0..100).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<Timestamp> = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let len = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), len, "all timestamps must be unique across threads");
    }

    proptest! {
        #[test]
        fn counter_is_strictly_increasing(calls in 1usize..256) {
            let clock = CounterClock::new();
            let stamps: Vec<Timestamp> = (0..calls).map(|_| clock.now()).collect();
            prop_assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(stamps.last().copied(), Some(Timestamp::new(0, calls as u64)));
        }
    }
}
