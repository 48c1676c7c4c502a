//! Per-axis stepper frequency state machine, coordinated XY locator and Z
//! elevator for a three-axis stepper-driven machine.
//!
//! This crate has no dependency on any particular board or operating
//! system: callers provide a [`hal::GpioPort`] implementation for each
//! axis and drive [`stepper::Stepper::exec`]/[`stepper::Stepper::release`]
//! from whatever timer ticks on their platform (a hardware timer ISR on
//! firmware, a discrete tick driver in tests and simulation).
#![cfg_attr(not(feature = "std"), no_std)]

pub mod diag;
pub mod elevator;
pub mod event_bus;
pub mod hal;
pub mod locator;
pub mod stepper;
pub mod vec2;

#[cfg(test)]
mod testing;

pub use diag::ErrorCode;
pub use elevator::{Elevator, ElevatorSnapshot};
pub use event_bus::EventBus;
pub use hal::GpioPort;
pub use locator::{Locator, LocatorSnapshot};
pub use stepper::{MicrostepMode, Stepper, StepperSnapshot};
pub use vec2::Vec2;
