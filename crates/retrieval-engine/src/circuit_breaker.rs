//! Per-adapter circuit breaker.
//!
//! Unlike a classic three-state breaker, there is no distinct half-open
//! state: once the cooldown elapses the very next call is let through,
//! and its own outcome decides whether the breaker stays closed or trips
//! again. Concurrent calls that land right after cooldown may all be let
//! through as probes; each is scored independently.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use retrieval_types::CircuitState;

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// Tracks one [`CircuitState`] per key (adapter name, or adapter+provider).
pub struct CircuitBreaker<K: Eq + Hash + Clone> {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<K, CircuitState>>,
}

impl<K: Eq + Hash + Clone> CircuitBreaker<K> {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a call for `key` is currently allowed. A poisoned mutex
    /// fails open rather than wedging every caller behind a panicked lock.
    pub fn is_available(&self, key: &K) -> bool {
        let states = match self.states.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match states.get(key) {
            None => true,
            Some(state) => !state.is_open(Instant::now()),
        }
    }

    pub fn record_success(&self, key: &K) {
        let mut states = match self.states.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        states.insert(key.clone(), CircuitState::default());
    }

    /// Returns `true` if this failure tripped the breaker open.
    pub fn record_failure(&self, key: &K) -> bool {
        let mut states = match self.states.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = states.entry(key.clone()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.config.failure_threshold {
            state.open_until = Some(Instant::now() + self.config.cooldown);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_is_available() {
        let cb: CircuitBreaker<&str> = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert!(cb.is_available(&"index"));
    }

    #[test]
    fn threshold_failures_trip_the_breaker() {
        let cb: CircuitBreaker<&str> = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        });
        assert!(!cb.record_failure(&"index"));
        assert!(!cb.record_failure(&"index"));
        assert!(cb.record_failure(&"index"));
        assert!(!cb.is_available(&"index"));
    }

    #[test]
    fn success_resets_the_failure_count() {
        let cb: CircuitBreaker<&str> = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
        });
        assert!(!cb.record_failure(&"index"));
        cb.record_success(&"index");
        assert!(!cb.record_failure(&"index"));
        assert!(cb.is_available(&"index"));
    }

    #[test]
    fn independent_keys_do_not_share_state() {
        let cb: CircuitBreaker<&str> = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
        });
        assert!(cb.record_failure(&"index"));
        assert!(cb.is_available(&"embedding"));
    }
}
