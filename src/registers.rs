//! Holding registers of the regulation module used by the control loop.
//!
//! The module exposes many more registers (presets, protections, display
//! settings); only the output voltage setting and the measured output are mapped here.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum RegulatorRegister {
    /// __R/W__ - Output voltage setting.
    ///
    /// Raw value in voltage steps, see [`ScalingFactors`](crate::scaling::ScalingFactors).
    /// E.g. 5.24V => `524` with 10mV steps.
    VSet = 0x00,
    /// __R__ - Measured output voltage.
    VOut = 0x02,
    /// __R__ - Measured output current.
    IOut = 0x03,
}

impl From<RegulatorRegister> for u16 {
    fn from(value: RegulatorRegister) -> Self {
        value as u16
    }
}
