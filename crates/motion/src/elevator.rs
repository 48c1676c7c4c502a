//! Single-axis target-seeking controller for the Z stepper.
//!
//! Unlike the coordinated XY locator, the elevator has no second axis to
//! equalize against: it simply drives Z toward `f_best` (or faster, while
//! coarsening the microstep resolution) until the target is reached, then
//! idles back down to the finest resolution.
use crate::stepper::{sign, MicrostepMode, Stepper};
use crate::hal::GpioPort;

/// Optional completion callback. Invoked with the elevator's user-defined
/// `state` tag when a target is reached; may return the next Z target
/// (in sub-steps) to chain into immediately.
pub type Callback = fn(state: i32) -> Option<i64>;

/// A point-in-time snapshot of an elevator's internal state, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatorSnapshot {
    pub value: i64,
    pub last_target: i64,
    pub curr_target: i64,
    pub enabled: bool,
}

pub struct Elevator<'a, P: GpioPort> {
    stepper: &'a mut Stepper<P>,
    f_best: i64,
    df_max: i64,
    last_target: i64,
    curr_target: i64,
    callback: Option<Callback>,
    state: i32,
    enabled: bool,
}

impl<'a, P: GpioPort> Elevator<'a, P> {
    pub fn new(stepper: &'a mut Stepper<P>) -> Self {
        let value = stepper.value();
        Elevator {
            stepper,
            f_best: 1,
            df_max: 2,
            last_target: value,
            curr_target: value,
            callback: None,
            state: 0,
            enabled: true,
        }
    }

    pub fn reset(&mut self) {
        self.f_best = 1;
        self.df_max = 2;
        let value = self.stepper.value();
        self.last_target = value;
        self.curr_target = value;
        self.callback = None;
        self.state = 0;
        self.enabled = true;
    }

    /// Re-origin the Z axis (e.g. after homing) without triggering motion.
    pub fn reset_z(&mut self, z: i64) {
        self.stepper.reset_position(z);
        self.last_target = z;
        self.curr_target = z;
    }

    pub fn update(&mut self) {
        if !self.enabled {
            return;
        }
        if !self.has_target() {
            if !self.stepper.is_slowest_microstep() {
                self.stepper.microstep(MicrostepMode::SLOWEST, false);
            }
            self.stepper.move_to_freq(0);
            return;
        }
        if self.has_reached_target() {
            if !self.stepper.is_slowest_microstep() {
                self.stepper.microstep(MicrostepMode::SLOWEST, false);
            }
            self.stepper.move_to_freq(0);
            if let Some(cb) = self.callback {
                if let Some(next) = cb(self.state) {
                    self.set_target(next);
                }
            }
            self.last_target = self.curr_target;
            return;
        }

        let mut dz = self.real_delta();
        self.stepper.move_to_freq(self.best_freq(dz));
        self.stepper.set_safe_freq(self.f_best);
        self.stepper.set_delta_freq(self.df_max);

        if self.stepper.current_freq().abs() == 1 {
            dz = dz.abs();
            if dz > 4000 {
                self.stepper.microstep(MicrostepMode::Half, false);
            } else if dz >= 1000 {
                self.stepper.microstep(MicrostepMode::Quarter, false);
            } else if !self.stepper.is_slowest_microstep() {
                self.stepper.microstep(MicrostepMode::SLOWEST, false);
            }
        }
    }

    pub fn best_freq(&self, delta: i64) -> i64 {
        sign(delta) * self.f_best
    }

    pub fn set_target(&mut self, z: i64) {
        self.last_target = self.curr_target;
        self.curr_target = z;
    }

    pub fn set_best_freq(&mut self, f: i64) {
        if f != 0 {
            self.f_best = f;
        }
    }

    pub fn set_max_delta_freq(&mut self, df: i64) {
        if df != 0 {
            self.df_max = df;
        }
    }

    pub fn set_callback(&mut self, cb: Option<Callback>) {
        self.callback = cb;
    }

    pub fn set_state(&mut self, state: i32) {
        self.state = state;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn target(&self) -> i64 {
        self.curr_target
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn real_delta(&self) -> i64 {
        self.curr_target - self.stepper.value()
    }

    pub fn curr_delta(&self) -> i64 {
        self.curr_target - self.last_target
    }

    pub fn has_target(&self) -> bool {
        self.last_target != self.curr_target || !self.has_reached_target()
    }

    pub fn has_reached_target(&self) -> bool {
        let curr_delta = self.stepper.value() - self.curr_target;
        let full_delta = self.last_target - self.curr_target;
        let overshot = (curr_delta < 0 && full_delta > 0) || (curr_delta > 0 && full_delta < 0);
        overshot || curr_delta.abs() <= self.stepper.step_size()
    }

    /// Run one `update`/`exec`/`release` cycle. Convenience for callers
    /// driving the elevator from a plain tick loop rather than a timer
    /// ISR.
    pub fn tick(&mut self) {
        self.update();
        self.stepper.exec();
        self.stepper.release();
    }

    pub fn debug(&self) -> ElevatorSnapshot {
        ElevatorSnapshot {
            value: self.stepper.value(),
            last_target: self.last_target,
            curr_target: self.curr_target,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPort;

    fn stepper() -> Stepper<RecordingPort> {
        let mut s = Stepper::new(RecordingPort::default(), 'z', true);
        s.reset();
        s
    }

    #[test]
    fn reaches_target_within_step_size_tolerance() {
        let mut s = stepper();
        let mut e = Elevator::new(&mut s);
        e.set_target(200);
        for _ in 0..5000 {
            e.tick();
            if !e.has_target() {
                break;
            }
        }
        let final_value = e.stepper.value();
        assert!((final_value - 200).abs() <= e.stepper.step_size());
    }

    #[test]
    fn disabled_elevator_does_not_move() {
        let mut s = stepper();
        let mut e = Elevator::new(&mut s);
        e.disable();
        e.set_target(500);
        for _ in 0..100 {
            e.tick();
        }
        assert_eq!(e.stepper.value(), 0);
    }
}
