//! Wall-clock pacing for the driving loop.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize the driving thread with a fixed cadence.
///
/// Between cycles, control is handed to the virtual machine. The time
/// spent there is taken into account when scheduling the next cycle.
pub struct Clock {
    last: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            last: Instant::now(),
            interval,
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Check whether the interval has elapsed, starting the next cycle if so.
    pub fn tick(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            // Start from now, rather than trying to catch up. If the caller
            // was paused for a long time, it should simply continue at its
            // usual pace.
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next cycle.
    pub fn wait(&mut self) {
        while self.last.elapsed() < self.interval {
            // Sleeping does not have enough resolution, while spinning
            // burns a core. Yielding in a loop is the middle ground.
            thread::yield_now();
        }
        self.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_interval_always_ticks() {
        let mut clock = Clock::new(Duration::ZERO);
        assert!(clock.tick());
        assert!(clock.tick());
    }
}
