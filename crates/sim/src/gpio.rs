//! A [`GpioPort`] test double that records every pin write instead of
//! touching hardware, for use in `host`/`firmware` integration tests and
//! the tick-driving harness in [`crate::tick_driver`].
use motion::hal::GpioPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordingPort {
    pub step: bool,
    pub dir: bool,
    pub microstep: (bool, bool, bool),
    pub enabled: bool,
    pub step_pulses: u64,
}

impl GpioPort for RecordingPort {
    type Error = core::convert::Infallible;

    fn set_step(&mut self, high: bool) -> Result<(), Self::Error> {
        if high && !self.step {
            self.step_pulses += 1;
        }
        self.step = high;
        Ok(())
    }

    fn set_dir(&mut self, high: bool) -> Result<(), Self::Error> {
        self.dir = high;
        Ok(())
    }

    fn set_microstep(&mut self, ms1: bool, ms2: bool, ms3: bool) -> Result<(), Self::Error> {
        self.microstep = (ms1, ms2, ms3);
        Ok(())
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.enabled = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_rising_edges_on_the_step_pin() {
        let mut port = RecordingPort::default();
        port.set_step(true).unwrap();
        port.set_step(true).unwrap();
        port.set_step(false).unwrap();
        port.set_step(true).unwrap();
        assert_eq!(port.step_pulses, 2);
    }
}
