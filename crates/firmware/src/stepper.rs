//! Stepper motor control.
//!
//! One periodic task owns all four axes and drives the tick contract
//! (`Stepper::exec`/`Stepper::release`, by way of `Locator`/`Elevator`)
//! against real DRV8825-driven GPIO — the hardware-timer equivalent of
//! `sim::TickDriver` in tests. There is no host link wired up here: a
//! real build also needs something to feed `Locator::set_target`/
//! `Elevator::set_target` from the other side of a wire, which is out
//! of scope for this firmware image.
use crate::boards::stm32f407::pins::{AxisPins, BoardPins};
use core::convert::Infallible;
use driver_drv8825::Drv8825;
use embassy_stm32::gpio::{AnyPin, Level, Output, Speed};
use embassy_time::{Duration, Timer};
use motion::{Elevator, Locator, Stepper};

type AxisDriver = Drv8825<
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
>;

fn build_driver(pins: AxisPins) -> Result<AxisDriver, Infallible> {
    Drv8825::new(
        Output::new(pins.step, Level::Low, Speed::VeryHigh),
        Output::new(pins.dir, Level::Low, Speed::Low),
        Output::new(pins.enable, Level::High, Speed::Low),
        Output::new(pins.ms1, Level::Low, Speed::Low),
        Output::new(pins.ms2, Level::Low, Speed::Low),
        Output::new(pins.ms3, Level::Low, Speed::Low),
    )
}

/// The tick period: one `exec`/`release` pair per period, the same
/// contract `sim::TickDriver` exercises in tests.
const TICK_PERIOD: Duration = Duration::from_micros(50);

#[embassy_executor::task]
pub async fn stepper_task(pins: BoardPins) {
    defmt::info!("Stepper task started");

    let mut x = Stepper::new(build_driver(pins.x).unwrap(), 'x', true);
    let mut y = Stepper::new(build_driver(pins.y).unwrap(), 'y', true);
    let mut z = Stepper::new(build_driver(pins.z).unwrap(), 'z', true);
    let mut e = Stepper::new(build_driver(pins.e).unwrap(), 'e', true);
    x.reset();
    y.reset();
    z.reset();
    e.reset();

    let mut locator = Locator::new(&mut x, &mut y);
    let mut elevator = Elevator::new(&mut z);

    loop {
        locator.tick();
        elevator.tick();
        e.exec();
        e.release();
        Timer::after(TICK_PERIOD).await;
    }
}
