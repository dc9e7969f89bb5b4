//! util::debounce
//!
//! Time-gated emission for repeated warnings.
//!
//! The router warns when a (search host, code host) pair has no
//! configuration. A bulk run hits that path once per repository, so the
//! warning is debounced: suppressed while the previous one is younger than
//! the threshold. This is a courtesy to the operator, not a correctness
//! control.
//!
//! The clock is injectable so tests do not sleep.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().expect("clock lock poisoned") += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("clock lock poisoned")
    }
}

/// Emission gate with a minimum interval between emissions.
pub struct Debounce {
    threshold: Duration,
    clock: Box<dyn Clock>,
    last_emitted: Mutex<Option<Instant>>,
}

impl Debounce {
    pub fn new(threshold: Duration) -> Self {
        Self::with_clock(threshold, Box::new(SystemClock))
    }

    pub fn with_clock(threshold: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            threshold,
            clock,
            last_emitted: Mutex::new(None),
        }
    }

    /// Whether the caller should emit now. Marks an emission when it
    /// answers `true`.
    pub fn should_emit(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last_emitted.lock().expect("debounce lock poisoned");
        match *last {
            Some(at) if now.duration_since(at) < self.threshold => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_emission_always_allowed() {
        let debounce = Debounce::new(Duration::from_millis(100));
        assert!(debounce.should_emit());
    }

    #[test]
    fn emissions_within_threshold_suppressed() {
        let clock = Arc::new(ManualClock::new());
        let debounce = Debounce::with_clock(
            Duration::from_millis(100),
            Box::new(SharedClock(Arc::clone(&clock))),
        );

        assert!(debounce.should_emit());
        clock.advance(Duration::from_millis(50));
        assert!(!debounce.should_emit());
        clock.advance(Duration::from_millis(60));
        assert!(debounce.should_emit());
        assert!(!debounce.should_emit());
    }

    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> Instant {
            self.0.now()
        }
    }
}
