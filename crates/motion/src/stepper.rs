//! Per-axis stepper frequency state machine.
//!
//! A [`Stepper`] does not track velocity or acceleration directly; it
//! tracks a signed *period* (named `f` throughout, for historical reasons
//! going back to the frequency-of-ticks framing of the original firmware)
//! and walks it toward a target period one `exec`/`release` tick pair at a
//! time. The sign of the period is the direction of travel, `0` means
//! idle, and the further from zero, the slower the axis is actually
//! moving (a period of `f` means one step every `|f|` ticks).
use crate::diag::{self, ErrorCode};
use crate::hal::GpioPort;
use core::convert::TryFrom;

/// The idle period: no target, no motion.
pub const IDLE_FREQ: i64 = 0;

/// Return `-1` for negative values and `1` otherwise (zero included), the
/// same convention the rest of the frequency state machine relies on for
/// "which way do we nudge things".
pub(crate) fn sign(v: i64) -> i64 {
    if v < 0 {
        -1
    } else {
        1
    }
}

fn same_direction(a: i64, b: i64) -> bool {
    (a > 0 && b > 0) || (a < 0 && b < 0)
}

/// Round `num / den` to the nearest integer, ties away from zero.
/// `num` and `den` must both be non-negative.
pub(crate) fn round_div_nonneg(num: i64, den: i64) -> i64 {
    debug_assert!(den > 0);
    (num + den / 2) / den
}

/// Microstepping resolution, and the three-bit pin encoding a driver
/// reads it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrostepMode {
    Full,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl MicrostepMode {
    /// Sub-steps advanced per physical step pulse at this resolution.
    pub fn step_delta(self) -> i64 {
        match self {
            MicrostepMode::Full => 16,
            MicrostepMode::Half => 8,
            MicrostepMode::Quarter => 4,
            MicrostepMode::Eighth => 2,
            MicrostepMode::Sixteenth => 1,
        }
    }

    /// The (ms1, ms2, ms3) pin levels for this mode.
    pub fn pins(self) -> (bool, bool, bool) {
        match self {
            MicrostepMode::Full => (false, false, false),
            MicrostepMode::Half => (true, false, false),
            MicrostepMode::Quarter => (false, true, false),
            MicrostepMode::Eighth => (true, true, false),
            MicrostepMode::Sixteenth => (true, true, true),
        }
    }

    /// The finest resolution, used whenever an axis is idle or about to
    /// accelerate from a stop.
    pub const SLOWEST: MicrostepMode = MicrostepMode::Sixteenth;
}

impl TryFrom<u8> for MicrostepMode {
    type Error = ErrorCode;

    fn try_from(mask: u8) -> Result<Self, ErrorCode> {
        match mask & 0b111 {
            0b000 => Ok(MicrostepMode::Full),
            0b100 => Ok(MicrostepMode::Half),
            0b010 => Ok(MicrostepMode::Quarter),
            0b110 => Ok(MicrostepMode::Eighth),
            0b111 => Ok(MicrostepMode::Sixteenth),
            _ => Err(ErrorCode::InvalidMsMode),
        }
    }
}

/// A point-in-time snapshot of a stepper's internal state, for logging or
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperSnapshot {
    pub ident: char,
    pub steps: i64,
    pub f_cur: i64,
    pub f_trg: i64,
    pub f_mem: i64,
    pub count: i64,
    pub df: i64,
    pub f_safe: i64,
    pub step_dir: i64,
    pub step_delta: i64,
    pub min_steps: i64,
    pub max_steps: i64,
}

/// One axis driven by a step/dir/microstep/enable pin set.
pub struct Stepper<P: GpioPort> {
    pins: P,
    ident: char,
    positive_dir_high: bool,

    enabled: bool,

    count: i64,
    f_cur: i64,
    f_trg: i64,
    f_mem: i64,
    df: i64,
    f_safe: i64,

    step_mode: MicrostepMode,
    steps: i64,
    step_delta: i64,
    step_dir: i64,

    max_steps: i64,
    min_steps: i64,
    step_range: i64,
}

impl<P: GpioPort> Stepper<P> {
    /// Build a stepper bound to the given pin set. `positive_dir_high`
    /// selects which logic level corresponds to the positive direction;
    /// pins are not written until [`Stepper::reset`] is called.
    pub fn new(pins: P, ident: char, positive_dir_high: bool) -> Self {
        Stepper {
            pins,
            ident,
            positive_dir_high,
            enabled: false,
            count: 0,
            f_cur: 0,
            f_trg: 0,
            f_mem: 0,
            df: 1,
            f_safe: 5,
            step_mode: MicrostepMode::SLOWEST,
            steps: 0,
            step_delta: MicrostepMode::SLOWEST.step_delta(),
            step_dir: 1,
            max_steps: i64::MAX,
            min_steps: i64::MIN,
            step_range: 0,
        }
    }

    fn dir_level(&self, positive: bool) -> bool {
        if positive {
            self.positive_dir_high
        } else {
            !self.positive_dir_high
        }
    }

    /// Re-initialize the dynamic (frequency, bounds) state as it would be
    /// right after power-on, without forgetting which physical axis this
    /// is. Does not touch the current position.
    pub fn reset(&mut self) {
        self.enable();
        self.df = 1;
        self.f_safe = 5;
        self.count = 0;
        self.f_cur = 0;
        self.f_trg = 0;
        self.f_mem = 0;
        self.max_steps = i64::MAX;
        self.min_steps = i64::MIN;
        self.step_range = 0;
        self.step_dir = 1;
        let _ = self.pins.set_step(false);
        let high = self.dir_level(true);
        let _ = self.pins.set_dir(high);
        self.microstep(MicrostepMode::SLOWEST, false);
        self.disable();
    }

    /// Advance the step pin if this tick is a trigger tick. Call once per
    /// tick, paired with [`Stepper::release`].
    pub fn exec(&mut self) {
        if self.is_frozen() {
            self.trigger_update();
        }
        if self.is_triggering() && self.can_trigger() {
            self.enable();
            let _ = self.pins.set_step(true);
            self.steps += self.step_dir * self.step_delta;
        }
    }

    /// Drop the step pin and account for the tick. Call once per tick,
    /// immediately after [`Stepper::exec`].
    pub fn release(&mut self) {
        if self.is_running() {
            if self.is_triggering() {
                let _ = self.pins.set_step(false);
                self.trigger_update();
            }
            self.count += 1;
            if !self.can_trigger() {
                self.f_trg = IDLE_FREQ;
                self.f_cur = IDLE_FREQ;
            }
        }
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            let _ = self.pins.set_enable(true);
            self.enabled = true;
        }
    }

    /// Disable the driver, but only if the axis is not currently running;
    /// cutting power mid-move would let the motor coast out of sync with
    /// the tracked position.
    pub fn disable(&mut self) {
        if self.enabled && !self.is_running() {
            let _ = self.pins.set_enable(false);
            self.enabled = false;
        }
    }

    /// Set the microstepping resolution.
    pub fn microstep(&mut self, mode: MicrostepMode, force_disable: bool) {
        self.enable();
        self.step_mode = mode;
        self.step_delta = mode.step_delta();
        let (a, b, c) = mode.pins();
        let _ = self.pins.set_microstep(a, b, c);
        if force_disable {
            self.disable();
        }
    }

    /// Like [`Stepper::microstep`], but from a raw three-bit pin mask.
    /// Invalid masks raise [`ErrorCode::InvalidMsMode`] and leave the
    /// resolution unchanged.
    pub fn microstep_from_mask(&mut self, mask: u8, force_disable: bool) -> Result<(), ErrorCode> {
        match MicrostepMode::try_from(mask) {
            Ok(mode) => {
                self.microstep(mode, force_disable);
                Ok(())
            }
            Err(e) => {
                diag::raise(e);
                Err(e)
            }
        }
    }

    pub fn is_slowest_microstep(&self) -> bool {
        self.step_mode == MicrostepMode::Sixteenth
    }

    /// Set a new target period. Does not itself change direction or
    /// speed; the change only happens tick by tick through `exec`/`release`.
    pub fn move_to_freq(&mut self, f: i64) {
        self.f_trg = f;
    }

    /// Invalidate the oscillation guard so the very next frequency
    /// transition is not blocked by [`Stepper::trigger_update`]'s "don't
    /// immediately undo the last change" check. Called whenever a new
    /// target is set from outside (e.g. by a coordinated move), since the
    /// guard's purpose is to damp out jitter within a single move, not to
    /// block starting a new one.
    pub fn reset_memory(&mut self) {
        self.f_mem = self.f_cur;
    }

    /// Re-origin the stepper's position to `absolute`, translating any
    /// configured bounds by the same delta so they remain meaningful.
    pub fn reset_position(&mut self, absolute: i64) {
        let delta = absolute - self.steps;
        self.steps = absolute;
        if self.min_steps != i64::MIN {
            self.min_steps = self.min_steps.saturating_add(delta);
        }
        if self.max_steps != i64::MAX {
            self.max_steps = self.max_steps.saturating_add(delta);
        }
    }

    pub fn set_max_value(&mut self, max_value: i64, range_update: bool) {
        self.max_steps = max_value;
        if self.steps > self.max_steps {
            self.steps = self.max_steps;
        }
        if self.step_range != 0 && range_update {
            self.set_min_value(self.max_steps - self.step_range, false);
        }
    }

    pub fn set_min_value(&mut self, min_value: i64, range_update: bool) {
        self.min_steps = min_value;
        if self.steps < self.min_steps {
            self.steps = self.min_steps;
        }
        if self.step_range != 0 && range_update {
            self.set_max_value(self.min_steps + self.step_range, false);
        }
    }

    /// Set the allowed travel span, propagated from whichever bound is
    /// already configured. If neither bound is set, the range is
    /// remembered but not applied until one is.
    pub fn set_range(&mut self, range: i64) {
        self.step_range = range;
        if self.min_steps != i64::MIN {
            self.set_max_value(self.min_steps + self.step_range, false);
        } else if self.max_steps != i64::MAX {
            self.set_min_value(self.max_steps - self.step_range, false);
        } else {
            diag::raise(ErrorCode::MissingRange);
        }
    }

    /// Set the maximum per-tick frequency increment used while below the
    /// safe frequency. `df` must be positive; `0` raises
    /// [`ErrorCode::InvalidDeltaF`] and is ignored.
    pub fn set_delta_freq(&mut self, df: i64) {
        if df <= 0 {
            diag::raise(ErrorCode::InvalidDeltaF);
            return;
        }
        self.df = df;
    }

    pub fn set_safe_freq(&mut self, f_safe: i64) {
        self.f_safe = f_safe;
    }

    pub fn target_freq(&self) -> i64 {
        self.f_trg
    }

    pub fn current_freq(&self) -> i64 {
        self.f_cur
    }

    pub fn value(&self) -> i64 {
        self.steps
    }

    pub fn step_size(&self) -> i64 {
        self.step_delta
    }

    pub fn max_value(&self) -> i64 {
        self.max_steps
    }

    pub fn min_value(&self) -> i64 {
        self.min_steps
    }

    pub fn range(&self) -> i64 {
        self.step_range
    }

    pub fn ident(&self) -> char {
        self.ident
    }

    /// Total ticks it takes to walk from `f_c` to `f_t` under the given
    /// `df`, used by the two-axis equalization search. `df` must be
    /// positive or this does not terminate.
    pub fn time_between_freq(&self, f_c: i64, f_t: i64, df: i64) -> i64 {
        debug_assert!(df > 0);
        let mut t = 0;
        let mut f = f_c;
        while f != f_t {
            t += f.abs();
            f = self.update_freq(f, f_t, df);
        }
        t
    }

    /// Ticks remaining, from the current state, to reach `f_t`.
    pub fn time_to_freq(&self, f_t: i64, df: i64) -> i64 {
        let t = self.time_between_freq(self.f_cur, f_t, df);
        if t != 0 {
            t + 1 - self.count
        } else {
            0
        }
    }

    /// Position this axis would be at once it reaches `f_t`, walking the
    /// frequency state machine forward under `df` without side effects.
    pub fn value_at_freq_with_df(&self, f_t: i64, df: i64) -> i64 {
        let mut d = self.steps;
        let mut f = self.f_cur;
        while f != f_t {
            d += sign(f) * self.step_delta;
            f = self.update_freq(f, f_t, df);
        }
        d
    }

    pub fn value_at_freq(&self, f_t: i64) -> i64 {
        self.value_at_freq_with_df(f_t, self.df)
    }

    pub fn is_running(&self) -> bool {
        self.f_trg != IDLE_FREQ || self.f_cur != IDLE_FREQ
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_safe_freq(&self, f: i64) -> bool {
        f == IDLE_FREQ || f.abs() >= self.f_safe
    }

    pub fn has_safe_freq(&self) -> bool {
        self.is_safe_freq(self.f_cur)
    }

    pub fn has_correct_direction(&self) -> bool {
        !((self.f_cur > 0 && self.f_trg < 0) || (self.f_cur < 0 && self.f_trg > 0))
    }

    pub fn has_range(&self) -> bool {
        self.step_range != 0
    }

    fn is_triggering(&self) -> bool {
        self.f_cur != 0 && self.count >= self.f_cur.abs()
    }

    fn can_trigger(&self) -> bool {
        let next_step = self.steps + self.step_dir * self.step_delta;
        if self.step_dir < 0 {
            next_step > self.min_steps
        } else {
            next_step < self.max_steps
        }
    }

    fn is_frozen(&self) -> bool {
        self.f_cur == 0 && self.f_trg != 0
    }

    fn trigger_update(&mut self) {
        self.count = 0;
        let f_tmp = self.f_cur;
        let f_new = self.update_freq(self.f_cur, self.f_trg, self.df);
        if f_new != f_tmp && f_new == self.f_mem && f_tmp != IDLE_FREQ {
            self.f_cur = f_tmp;
        } else {
            self.f_mem = f_tmp;
            self.f_cur = f_new;
        }
        if self.f_cur != f_tmp && self.f_cur != 0 && sign(self.f_cur) != self.step_dir {
            self.step_dir = sign(self.f_cur);
            let high = self.dir_level(self.step_dir > 0);
            let _ = self.pins.set_dir(high);
        }
    }

    /// The frequency state machine: given the current period `f_c` and
    /// target period `f_t`, compute the next period under a maximum
    /// per-tick change of `df`.
    ///
    /// - If both periods are already at or above the safe frequency, jump
    ///   straight to the target (no risk from a direct speed change).
    /// - If both periods are moving the same direction, step toward the
    ///   target by `df`, clamping if that would overshoot.
    /// - Otherwise a direction reversal is needed: slow to the safe
    ///   frequency first if not already there, then flip.
    pub(crate) fn update_freq(&self, f_c: i64, f_t: i64, df: i64) -> i64 {
        if f_c == f_t {
            return f_t;
        }
        let safe_cur = self.is_safe_freq(f_c);
        let safe_trg = self.is_safe_freq(f_t);
        if safe_cur && safe_trg {
            f_t
        } else if same_direction(f_c, f_t) {
            let s0 = sign(f_t - f_c);
            let stepped = f_c + s0 * df;
            if sign(f_t - stepped) != s0 {
                f_t
            } else {
                stepped
            }
        } else if safe_cur {
            self.f_safe * sign(f_t)
        } else {
            f_c + sign(f_c) * df
        }
    }

    pub fn snapshot(&self) -> StepperSnapshot {
        StepperSnapshot {
            ident: self.ident,
            steps: self.steps,
            f_cur: self.f_cur,
            f_trg: self.f_trg,
            f_mem: self.f_mem,
            count: self.count,
            df: self.df,
            f_safe: self.f_safe,
            step_dir: self.step_dir,
            step_delta: self.step_delta,
            min_steps: self.min_steps,
            max_steps: self.max_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPort;

    fn stepper() -> Stepper<RecordingPort> {
        let mut s = Stepper::new(RecordingPort::default(), 'x', false);
        s.reset();
        s
    }

    #[test]
    fn tick_pair_advances_position_by_exactly_one_step_delta() {
        let mut s = stepper();
        s.set_safe_freq(1);
        s.move_to_freq(1);
        let before = s.value();
        for _ in 0..8 {
            s.exec();
            s.release();
        }
        // at f=1 (one tick per step) every tick pair should trigger.
        assert!((s.value() - before).abs() >= s.step_size());
    }

    #[test]
    fn reaching_the_upper_bound_halts_motion() {
        let mut s = stepper();
        s.set_max_value(4, false);
        s.set_safe_freq(1);
        s.move_to_freq(1);
        for _ in 0..100 {
            s.exec();
            s.release();
        }
        assert!(s.value() <= 4);
        assert!(!s.is_running());
    }

    #[test]
    fn reversal_passes_through_the_safe_frequency() {
        let mut s = stepper();
        s.set_safe_freq(5);
        s.set_delta_freq(1);
        s.move_to_freq(20);
        for _ in 0..200 {
            s.exec();
            s.release();
        }
        assert_eq!(s.current_freq(), 20);
        s.move_to_freq(-20);
        let mut saw_direction_change = false;
        let mut last_dir = sign(s.current_freq());
        for _ in 0..400 {
            s.exec();
            s.release();
            let cur = s.current_freq();
            if cur != 0 {
                let dir = sign(cur);
                if dir != last_dir {
                    // a reversal must cross through the safe band, never
                    // jump directly between two unsafe opposite periods.
                    assert!(s.is_safe_freq(cur) || cur.abs() <= s.f_safe);
                    saw_direction_change = true;
                    last_dir = dir;
                }
            }
        }
        assert!(saw_direction_change);
    }

    #[test]
    fn zero_delta_freq_is_rejected() {
        diag::clear();
        let mut s = stepper();
        let before = s.df;
        s.set_delta_freq(0);
        assert_eq!(s.df, before);
        assert_eq!(diag::take(), Some(ErrorCode::InvalidDeltaF));
    }

    #[test]
    fn reset_position_translates_both_bounds() {
        let mut s = stepper();
        s.set_min_value(-100, false);
        s.set_max_value(100, false);
        s.reset_position(0);
        assert_eq!(s.min_value(), -100);
        assert_eq!(s.max_value(), 100);
        s.reset_position(50);
        assert_eq!(s.min_value(), -50);
        assert_eq!(s.max_value(), 150);
    }

    #[test]
    fn invalid_microstep_mask_is_reported() {
        diag::clear();
        let mut s = stepper();
        assert!(s.microstep_from_mask(0b011, false).is_err());
        assert_eq!(diag::take(), Some(ErrorCode::InvalidMsMode));
    }
}
