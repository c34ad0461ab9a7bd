//! Value types shared between the link, controller, reporter and loop.

use strum_macros::{EnumIter, IntoStaticStr};

/// Output voltage target while the load is light.
pub const LOW_SETPOINT_VOLTS: f32 = 5.24;
/// Output voltage target while the load draws at least [`HIGH_LOAD_AMPS`].
pub const HIGH_SETPOINT_VOLTS: f32 = 5.35;
/// Load current at which the high setpoint is selected.
pub const HIGH_LOAD_AMPS: f32 = 2.0;

/// Which quantity a [`Measurement`] carries.
///
/// The static string is the value type segment used by the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum MeasurementKind {
    #[strum(serialize = "AUX_VOLTAGE_OUTPUT")]
    Voltage,
    #[strum(serialize = "AUX_CURRENT")]
    Current,
}

impl MeasurementKind {
    /// Path segment under `/session/` for this kind.
    pub fn value_type(self) -> &'static str {
        self.into()
    }

    pub fn unit(self) -> &'static str {
        match self {
            MeasurementKind::Voltage => "V",
            MeasurementKind::Current => "A",
        }
    }
}

/// A single sample taken from the regulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub kind: MeasurementKind,
    pub value: f32,
}

impl Measurement {
    pub fn voltage(value: f32) -> Self {
        Self {
            kind: MeasurementKind::Voltage,
            value,
        }
    }

    pub fn current(value: f32) -> Self {
        Self {
            kind: MeasurementKind::Current,
            value,
        }
    }
}

impl core::fmt::Display for Measurement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}={:.3}{}", self.kind.value_type(), self.value, self.kind.unit())
    }
}

/// The two setpoints the controller moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetpointState {
    /// Not durable: a restarted process always assumes the low setpoint.
    #[default]
    Low,
    High,
}

impl SetpointState {
    /// Output voltage the regulator should rest at in this state.
    pub fn target_volts(self) -> f32 {
        match self {
            SetpointState::Low => LOW_SETPOINT_VOLTS,
            SetpointState::High => HIGH_SETPOINT_VOLTS,
        }
    }
}

/// Actuation requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Command the regulator's output voltage, in volts.
    SetVoltage(f32),
}
