#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _;

mod boards;
pub mod stepper;

use boards::stm32f407::pins::BoardPins;
use embassy_executor::Spawner;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    let pins = BoardPins::new(p);

    spawner.spawn(stepper::stepper_task(pins)).unwrap();
}
