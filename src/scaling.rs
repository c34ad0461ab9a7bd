//! Scaling between raw register values and physical units.
//!
//! Regulators in this family report voltage and current as integer counts of
//! a fixed step. The step size differs between models, so it is configurable.

/// Scaling factors for converting raw register values to standard units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingFactors {
    /// Millivolts per raw count (e.g. 10 means the register holds centivolts).
    pub voltage_divisor: u32,
    /// Milliamps per raw count (e.g. 10 means the register holds centiamps).
    pub current_divisor: u32,
}

impl Default for ScalingFactors {
    /// Centivolts and centiamps, which is what most of these modules use.
    fn default() -> Self {
        Self {
            voltage_divisor: 10,
            current_divisor: 10,
        }
    }
}

impl ScalingFactors {
    pub const fn new(voltage_divisor: u32, current_divisor: u32) -> Self {
        Self {
            voltage_divisor,
            current_divisor,
        }
    }

    /// Convert raw voltage register value to millivolts.
    #[inline]
    pub const fn raw_to_voltage_mv(&self, raw: u16) -> u32 {
        (raw as u32) * self.voltage_divisor
    }

    /// Convert millivolts to a raw voltage register value.
    ///
    /// Returns `None` when the value does not fit in a register.
    #[inline]
    pub fn voltage_mv_to_raw(&self, voltage_mv: u32) -> Option<u16> {
        u16::try_from(voltage_mv / self.voltage_divisor).ok()
    }

    /// Convert raw current register value to milliamps.
    #[inline]
    pub const fn raw_to_current_ma(&self, raw: u16) -> u32 {
        (raw as u32) * self.current_divisor
    }
}

/// Millivolts to volts.
pub fn mv_to_volts(mv: u32) -> f32 {
    mv as f32 / 1000.0
}

/// Milliamps to amps.
pub fn ma_to_amps(ma: u32) -> f32 {
    ma as f32 / 1000.0
}

/// Volts to the nearest millivolt. Negative inputs clamp to zero.
pub fn volts_to_mv(volts: f32) -> u32 {
    (volts * 1000.0).round().max(0.0) as u32
}
