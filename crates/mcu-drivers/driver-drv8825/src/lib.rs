//! A `no_std` `motion::GpioPort` implementation for the DRV8825 stepper
//! driver: step, direction, three microstep select lines and the
//! active-low enable line.
#![cfg_attr(not(feature = "std"), no_std)]

use embedded_hal::digital::{OutputPin, PinState};
use motion::hal::GpioPort;

/// One axis' worth of DRV8825 control pins.
pub struct Drv8825<STEP, DIR, EN, M0, M1, M2> {
    step: STEP,
    dir: DIR,
    enable: EN,
    m0: M0,
    m1: M1,
    m2: M2,
}

impl<STEP, DIR, EN, M0, M1, M2, E> Drv8825<STEP, DIR, EN, M0, M1, M2>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    M0: OutputPin<Error = E>,
    M1: OutputPin<Error = E>,
    M2: OutputPin<Error = E>,
{
    /// Creates a new DRV8825 pin bundle. The driver starts disabled
    /// (nENABLE high), matching the DRV8825's power-on state.
    pub fn new(step: STEP, dir: DIR, enable: EN, m0: M0, m1: M1, m2: M2) -> Result<Self, E> {
        let mut pins = Self { step, dir, enable, m0, m1, m2 };
        pins.enable.set_high()?;
        Ok(pins)
    }
}

fn state(high: bool) -> PinState {
    if high {
        PinState::High
    } else {
        PinState::Low
    }
}

impl<STEP, DIR, EN, M0, M1, M2, E> GpioPort for Drv8825<STEP, DIR, EN, M0, M1, M2>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    M0: OutputPin<Error = E>,
    M1: OutputPin<Error = E>,
    M2: OutputPin<Error = E>,
{
    type Error = E;

    fn set_step(&mut self, high: bool) -> Result<(), E> {
        self.step.set_state(state(high))
    }

    fn set_dir(&mut self, high: bool) -> Result<(), E> {
        self.dir.set_state(state(high))
    }

    fn set_microstep(&mut self, ms1: bool, ms2: bool, ms3: bool) -> Result<(), E> {
        self.m0.set_state(state(ms1))?;
        self.m1.set_state(state(ms2))?;
        self.m2.set_state(state(ms3))
    }

    /// The DRV8825's nENABLE line is active-low: `enabled = true` pulls
    /// it low.
    fn set_enable(&mut self, enabled: bool) -> Result<(), E> {
        self.enable.set_state(state(!enabled))
    }
}
