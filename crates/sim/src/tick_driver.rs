//! Discrete tick driver.
//!
//! Real hardware advances the frequency state machine from a timer ISR;
//! in tests and in-process simulation there is no timer, so
//! [`TickDriver::drive`] just calls the caller-supplied tick closure in a
//! loop until either a completion predicate is satisfied or a tick
//! budget runs out. This mirrors how `crates/firmware`'s Embassy task
//! calls `Stepper::exec`/`Stepper::release` once per timer period, minus
//! the timer.
pub struct TickDriver {
    ticks: u64,
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TickDriver {
    pub fn new() -> Self {
        TickDriver { ticks: 0 }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run `step` up to `max_ticks` times, stopping early the first time
    /// it reports completion (`true`). `step` both advances the machine
    /// for one tick and judges whether it has arrived, since a separate
    /// completion predicate would need its own borrow of whatever `step`
    /// already holds mutably. Returns the number of ticks actually run.
    pub fn drive<F>(&mut self, mut step: F, max_ticks: u64) -> u64
    where
        F: FnMut(u64) -> bool,
    {
        let mut run = 0;
        while run < max_ticks {
            let done = step(self.ticks);
            self.ticks += 1;
            run += 1;
            if done {
                break;
            }
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::RecordingPort;
    use motion::{Locator, Stepper};

    #[test]
    fn drive_stops_as_soon_as_the_predicate_is_satisfied() {
        let mut x = Stepper::new(RecordingPort::default(), 'x', true);
        let mut y = Stepper::new(RecordingPort::default(), 'y', true);
        x.reset();
        y.reset();
        let mut loc = Locator::new(&mut x, &mut y);
        loc.set_target(motion::Vec2::new(50, 0), true);

        let mut driver = TickDriver::new();
        let ran = driver.drive(
            |_tick| {
                loc.tick();
                !loc.has_target()
            },
            100_000,
        );

        assert!(ran < 100_000);
        assert!((loc.value().x - 50).abs() <= 1);
    }
}
