//! Coordinated two-axis (X/Y) motion.
//!
//! The locator does not plan a trajectory up front; each tick it looks at
//! where it currently is relative to the target and recomputes a "best"
//! frequency pair, then searches for the per-axis acceleration (`df`)
//! that keeps both axes arriving at that frequency pair at the same time
//! — which is what keeps a diagonal move a straight line instead of an
//! L-shape.
use crate::diag::{self, ErrorCode};
use crate::hal::GpioPort;
use crate::stepper::{round_div_nonneg, sign, MicrostepMode, Stepper};
use crate::vec2::Vec2;

/// Optional completion callback. Invoked with the locator's user-defined
/// `state` tag when a target is reached; may return the next target (and
/// whether it is a final stopping point) to chain into immediately.
pub type Callback = fn(state: i32) -> Option<(Vec2, bool)>;

/// A point-in-time snapshot of a locator's internal state, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorSnapshot {
    pub value: Vec2,
    pub last_target: Vec2,
    pub curr_target: Vec2,
    pub ending: bool,
    pub target_id: u64,
    pub enabled: bool,
}

pub struct Locator<'a, P: GpioPort> {
    x: &'a mut Stepper<P>,
    y: &'a mut Stepper<P>,

    f_best: i64,
    df_max: i64,
    epsilon: i64,
    epsilon_sq: i64,

    last_target: Vec2,
    curr_target: Vec2,
    ending: bool,
    target_id: u64,

    callback: Option<Callback>,
    state: i32,
    enabled: bool,
}

impl<'a, P: GpioPort> Locator<'a, P> {
    pub fn new(x: &'a mut Stepper<P>, y: &'a mut Stepper<P>) -> Self {
        let value = Vec2::new(x.value(), y.value());
        let epsilon = 5;
        Locator {
            x,
            y,
            f_best: 1,
            df_max: 1,
            epsilon,
            epsilon_sq: (epsilon * epsilon).max(1),
            last_target: value,
            curr_target: value,
            ending: true,
            target_id: 0,
            callback: None,
            state: 0,
            enabled: true,
        }
    }

    pub fn reset(&mut self) {
        self.f_best = 1;
        self.df_max = 1;
        self.set_precision(5);
        let value = self.value();
        self.last_target = value;
        self.curr_target = value;
        self.ending = true;
        self.callback = None;
        self.state = 0;
        self.enabled = true;
    }

    fn stepper(&self, i: usize) -> &Stepper<P> {
        match i {
            0 => self.x,
            1 => self.y,
            _ => {
                diag::raise(ErrorCode::InvalidAccessor);
                self.y
            }
        }
    }

    fn stepper_mut(&mut self, i: usize) -> &mut Stepper<P> {
        match i {
            0 => &mut *self.x,
            1 => &mut *self.y,
            _ => {
                diag::raise(ErrorCode::InvalidAccessor);
                &mut *self.y
            }
        }
    }

    /// The frequency pair that keeps both axes converging on `delta` at
    /// the same relative rate: the dominant axis (largest `|delta|`) runs
    /// at `f_best`, the other is slowed proportionally.
    pub fn best_freq(&self, delta: Vec2, f_best: i64) -> Vec2 {
        let abs = delta.abs();
        let d_max = abs.max_component();
        let mut f = Vec2::default();
        for i in 0..2 {
            let abs_i = abs.get(i);
            let delta_i = delta.get(i);
            if abs_i == d_max {
                f.set(i, sign(delta_i) * f_best);
            } else if abs_i <= self.stepper(i).step_size() {
                f.set(i, 0);
            } else {
                let magnitude = round_div_nonneg(f_best.abs() * d_max, abs_i);
                let mut f_i = sign(delta_i) * magnitude;
                // the rounded magnitude can end up below f_best; clamp it
                // back up rather than let the slave axis stall.
                if f_i.abs() < f_best {
                    f_i = sign(delta_i) * f_best;
                }
                f.set(i, f_i);
            }
        }
        f
    }

    pub fn update(&mut self) {
        if !self.enabled {
            return;
        }
        if !self.has_target() {
            if self.is_moving() {
                for i in 0..2 {
                    let s = self.stepper_mut(i);
                    if !s.is_slowest_microstep() {
                        s.microstep(MicrostepMode::SLOWEST, false);
                    }
                    if s.target_freq() != 0 {
                        s.move_to_freq(0);
                    }
                }
            }
            return;
        }

        let reached = self.has_reached_target();
        if reached {
            let last_id = self.target_id;
            if let Some(cb) = self.callback {
                if let Some((trg, end)) = cb(self.state) {
                    self.set_target(trg, end);
                }
            }
            if last_id == self.target_id {
                self.last_target = self.curr_target;
            }
        }

        let delta = self.real_delta();
        if self.is_ending() {
            let x0 = self.x.value_at_freq(0);
            let y0 = self.y.value_at_freq(0);
            let target_freq = if (self.curr_target - Vec2::new(x0, y0)).sq_length() < self.epsilon_sq {
                let peak = self.current_freq().abs().max_component() + 1;
                self.best_freq(delta, peak)
            } else {
                self.best_freq(delta, self.f_best)
            };
            self.adjust_to_freq(target_freq);
        } else {
            let f = self.best_freq(delta, self.f_best);
            self.adjust_to_freq(f);
        }
    }

    fn delta_time(t1: i64, t2: i64) -> i64 {
        (t1 - t2).abs()
    }

    /// Search, bounded to 1000 iterations, for the per-axis `df` that
    /// minimizes the difference between the two axes' estimated time to
    /// reach `f_trg`. Always tries raising acceleration before lowering
    /// it, so a search that makes no further progress still ends at the
    /// fastest feasible schedule.
    pub fn adjust_to_freq(&mut self, f_trg: Vec2) {
        let mut df = [self.df_max, self.df_max];
        let mut t = [
            self.x.time_to_freq(f_trg.x, df[0]),
            self.y.time_to_freq(f_trg.y, df[1]),
        ];
        let mut dt = Self::delta_time(t[0], t[1]);

        for _ in 0..1000 {
            let mut improved = false;

            for i in 0..2 {
                if df[i] < self.df_max {
                    let candidate = self.stepper(i).time_to_freq(f_trg.get(i), df[i] + 1);
                    let mut t2 = t;
                    t2[i] = candidate;
                    let dt2 = Self::delta_time(t2[0], t2[1]);
                    if dt2 < dt {
                        df[i] += 1;
                        t = t2;
                        dt = dt2;
                        improved = true;
                        break;
                    }
                }
            }
            if improved {
                continue;
            }

            for i in 0..2 {
                if df[i] > 1 {
                    let candidate = self.stepper(i).time_to_freq(f_trg.get(i), df[i] - 1);
                    let mut t2 = t;
                    t2[i] = candidate;
                    let dt2 = Self::delta_time(t2[0], t2[1]);
                    if dt2 < dt {
                        df[i] -= 1;
                        t = t2;
                        dt = dt2;
                        improved = true;
                        break;
                    }
                }
            }
            if !improved {
                break;
            }
        }

        for i in 0..2 {
            let dfi = df[i];
            let fi = f_trg.get(i);
            self.stepper_mut(i).set_delta_freq(dfi);
            self.stepper_mut(i).move_to_freq(fi);
        }
    }

    /// Set a new target. `ending` marks whether this is a final stopping
    /// point (triggers the slow-down heuristic near arrival) or an
    /// intermediate waypoint to carry speed through.
    pub fn set_target(&mut self, trg: Vec2, ending: bool) {
        self.last_target = self.curr_target;
        self.curr_target = trg;
        self.ending = ending;
        self.x.reset_memory();
        self.y.reset_memory();
        self.target_id = self.target_id.wrapping_add(1);
    }

    pub fn reset_x(&mut self, x: i64) {
        self.x.reset_position(x);
        self.last_target.x = x;
        self.curr_target.x = x;
    }

    pub fn reset_y(&mut self, y: i64) {
        self.y.reset_position(y);
        self.last_target.y = y;
        self.curr_target.y = y;
    }

    /// Re-origin a single axis by index (0 = x, 1 = y), as used by G92.
    pub fn reset_axis(&mut self, axis: usize, value: i64) {
        match axis {
            0 => self.reset_x(value),
            1 => self.reset_y(value),
            _ => diag::raise(ErrorCode::InvalidAccessor),
        }
    }

    pub fn debug(&self) -> LocatorSnapshot {
        LocatorSnapshot {
            value: self.value(),
            last_target: self.last_target,
            curr_target: self.curr_target,
            ending: self.ending,
            target_id: self.target_id,
            enabled: self.enabled,
        }
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

    pub fn set_precision(&mut self, eps: i64) {
        self.epsilon = eps;
        self.epsilon_sq = (eps * eps).max(1);
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

    pub fn value(&self) -> Vec2 {
        Vec2::new(self.x.value(), self.y.value())
    }

    pub fn target(&self) -> Vec2 {
        self.curr_target
    }

    pub fn current_freq(&self) -> Vec2 {
        Vec2::new(self.x.current_freq(), self.y.current_freq())
    }

    pub fn target_freq(&self) -> Vec2 {
        Vec2::new(self.x.target_freq(), self.y.target_freq())
    }

    pub fn curr_delta(&self) -> Vec2 {
        self.curr_target - self.last_target
    }

    pub fn real_delta(&self) -> Vec2 {
        self.curr_target - self.value()
    }

    pub fn has_target(&self) -> bool {
        self.last_target != self.curr_target || !self.has_reached_target()
    }

    pub fn is_ending(&self) -> bool {
        self.ending
    }

    pub fn has_reached_target(&self) -> bool {
        let r = self.real_delta();
        let d = self.curr_delta();
        r.dot(&d) < 0 || r.sq_length() <= self.epsilon_sq
    }

    pub fn is_moving(&self) -> bool {
        self.x.is_running() || self.y.is_running()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run one `update`/`exec`/`release` cycle on both axes. Convenience
    /// for callers driving the locator from a plain tick loop rather than
    /// a timer ISR.
    pub fn tick(&mut self) {
        self.update();
        self.x.exec();
        self.x.release();
        self.y.exec();
        self.y.release();
    }
}
