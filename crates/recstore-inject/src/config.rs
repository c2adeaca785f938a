use serde::{Deserialize, Serialize};

use recstore_store::{Clock, CounterClock, HybridClock};

use crate::options::ResolvedOptions;

/// Which [`Clock`] a store stamps mutations with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    /// Wall-clock milliseconds with a logical tie-breaker.
    #[default]
    Hybrid,
    /// Deterministic counter; useful for tests and replayable scripts.
    Counter,
}

/// Configuration for a [`DataStore`](crate::DataStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on reactions per record and flush before
    /// [`InjectError::ReactionLimitExceeded`](crate::InjectError::ReactionLimitExceeded).
    pub max_reaction_rounds: usize,
    pub clock: ClockKind,
    /// Injection options used where neither the definition nor the call
    /// site says otherwise.
    pub defaults: ResolvedOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_reaction_rounds: 32,
            clock: ClockKind::Hybrid,
            defaults: ResolvedOptions::default(),
        }
    }
}

impl StoreConfig {
    /// A configuration with a counter clock, for deterministic output.
    pub fn deterministic() -> Self {
        Self {
            clock: ClockKind::Counter,
            ..Default::default()
        }
    }

    pub fn build_clock(&self) -> Box<dyn Clock> {
        match self.clock {
            ClockKind::Hybrid => Box::new(HybridClock::new()),
            ClockKind::Counter => Box::new(CounterClock::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recstore_types::Timestamp;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.max_reaction_rounds, 32);
        assert_eq!(config.clock, ClockKind::Hybrid);
        assert!(config.defaults.notify);
        assert!(!config.defaults.keep_change_history);
    }

    #[test]
    fn deterministic_uses_counter_clock() {
        let clock = StoreConfig::deterministic().build_clock();
        assert_eq!(clock.now(), Timestamp::new(0, 1));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"clock": "counter", "defaults": {"keep_change_history": true}}"#)
                .unwrap();
        assert_eq!(config.clock, ClockKind::Counter);
        assert_eq!(config.max_reaction_rounds, 32);
        assert!(config.defaults.keep_change_history);
        assert!(config.defaults.notify);
    }
}
