//! Pin mapping for the MKS SKIPR board, narrowed to the pins the motion
//! core drives: step/direction/microstep-select/enable for X, Y, Z and
//! the extruder. Thermal and UART pins are not part of this firmware's
//! scope.

use embassy_stm32::gpio::AnyPin;

/// One axis' worth of DRV8825 control pins, before they are wrapped in
/// `driver_drv8825::Drv8825`.
pub struct AxisPins {
    pub step: AnyPin,
    pub dir: AnyPin,
    pub enable: AnyPin,
    pub ms1: AnyPin,
    pub ms2: AnyPin,
    pub ms3: AnyPin,
}

pub struct BoardPins {
    pub x: AxisPins,
    pub y: AxisPins,
    pub z: AxisPins,
    pub e: AxisPins,
}

impl BoardPins {
    /// Creates a new BoardPins struct for the MKS SKIPR.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        use embassy_stm32::gpio::Pin as _;

        // Note: these are example pins. Verify them against the MKS
        // SKIPR schematic before flashing real hardware.
        Self {
            x: AxisPins {
                step: p.PE2.degrade(),
                dir: p.PB8.degrade(),
                enable: p.PE4.degrade(),
                ms1: p.PE0.degrade(),
                ms2: p.PE1.degrade(),
                ms3: p.PD7.degrade(),
            },
            y: AxisPins {
                step: p.PC5.degrade(),
                dir: p.PB2.degrade(),
                enable: p.PE3.degrade(),
                ms1: p.PC0.degrade(),
                ms2: p.PC1.degrade(),
                ms3: p.PC2.degrade(),
            },
            z: AxisPins {
                step: p.PB4.degrade(),
                dir: p.PB5.degrade(),
                enable: p.PD6.degrade(),
                ms1: p.PD3.degrade(),
                ms2: p.PD4.degrade(),
                ms3: p.PD5.degrade(),
            },
            e: AxisPins {
                step: p.PB0.degrade(),
                dir: p.PB9.degrade(),
                enable: p.PA15.degrade(),
                ms1: p.PC6.degrade(),
                ms2: p.PC7.degrade(),
                ms3: p.PD2.degrade(),
            },
        }
    }
}
