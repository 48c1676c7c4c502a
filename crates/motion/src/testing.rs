//! A minimal infallible [`GpioPort`] test double, used by this crate's
//! own unit tests. The host-facing recording/tick-driving harness lives
//! in the `sim` crate; this one only needs to never fail and to let a
//! test assert on the pins it was last told to drive.
use crate::hal::GpioPort;
use core::convert::Infallible;

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordingPort {
    pub step: bool,
    pub dir: bool,
    pub microstep: (bool, bool, bool),
    pub enabled: bool,
    pub step_pulses: u32,
}

impl GpioPort for RecordingPort {
    type Error = Infallible;

    fn set_step(&mut self, high: bool) -> Result<(), Infallible> {
        if high && !self.step {
            self.step_pulses += 1;
        }
        self.step = high;
        Ok(())
    }

    fn set_dir(&mut self, high: bool) -> Result<(), Infallible> {
        self.dir = high;
        Ok(())
    }

    fn set_microstep(&mut self, ms1: bool, ms2: bool, ms3: bool) -> Result<(), Infallible> {
        self.microstep = (ms1, ms2, ms3);
        Ok(())
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), Infallible> {
        self.enabled = enabled;
        Ok(())
    }
}
