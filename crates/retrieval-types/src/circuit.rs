use std::time::Instant;

/// Snapshot of one adapter's circuit breaker. `open_until` is `None` when
/// closed; the breaker transitions back to closed on the first call after
/// `open_until` elapses, regardless of that call's outcome being observed
/// yet (see `CircuitBreaker::is_available` in `retrieval-engine`).
#[derive(Debug, Clone, Copy)]
pub struct CircuitState {
    pub consecutive_failures: u32,
    pub open_until: Option<Instant>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            open_until: None,
        }
    }
}

impl CircuitState {
    pub fn is_open(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }
}
