//! In-process tick-driving harness for exercising the motion core
//! without a timer ISR or any physical hardware: a [`gpio::RecordingPort`]
//! stands in for real step/dir/microstep/enable pins, [`tick_driver::TickDriver`]
//! drives `update`/`exec`/`release` cycles, and [`trace::MotionTrace`]
//! captures the resulting position-over-time series for comparison
//! against a golden trace in CI.
pub mod gpio;
pub mod tick_driver;
pub mod trace;

pub use gpio::RecordingPort;
pub use tick_driver::TickDriver;
pub use trace::{MotionSample, MotionTrace};
