//! Time source for reset debouncing.

use std::time::{Duration, Instant};

/// Elapsed time since some fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
///
/// Only available in test builds.
#[cfg(feature = "test-utils")]
#[derive(Debug, Clone, Default)]
pub struct ManualClock(std::rc::Rc<std::cell::Cell<Duration>>);

#[cfg(feature = "test-utils")]
impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

#[cfg(feature = "test-utils")]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}
