//! Two-state hysteresis setpoint policy.
//!
//! A transition only fires when the measured output voltage sits at the resting value of the
//! current state, so measurement noise around the load threshold or a regulator that has not
//! settled after the previous command cannot cause repeated toggling.

use crate::types::{Command, HIGH_LOAD_AMPS, HIGH_SETPOINT_VOLTS, LOW_SETPOINT_VOLTS, SetpointState};

/// Default window around a target within which the output counts as settled.
pub const DEFAULT_TOLERANCE_VOLTS: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hysteresis {
    /// Load current at or above which the high setpoint is wanted.
    pub threshold_amps: f32,
    pub low_volts: f32,
    pub high_volts: f32,
    /// Exclusive bound on `|voltage - target|`.
    pub tolerance_volts: f32,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            threshold_amps: HIGH_LOAD_AMPS,
            low_volts: LOW_SETPOINT_VOLTS,
            high_volts: HIGH_SETPOINT_VOLTS,
            tolerance_volts: DEFAULT_TOLERANCE_VOLTS,
        }
    }
}

impl Hysteresis {
    pub fn with_tolerance(tolerance_volts: f32) -> Self {
        Self {
            tolerance_volts,
            ..Self::default()
        }
    }

    /// Decide the next state from one cycle's voltage and current.
    ///
    /// Returns the state to adopt and the command that gets the regulator there, or the
    /// unchanged state and `None`.
    pub fn decide(
        &self,
        state: SetpointState,
        voltage: f32,
        current: f32,
    ) -> (SetpointState, Option<Command>) {
        match state {
            SetpointState::Low
                if current >= self.threshold_amps && self.settled_at(voltage, self.low_volts) =>
            {
                (SetpointState::High, Some(Command::SetVoltage(self.high_volts)))
            }
            SetpointState::High
                if current < self.threshold_amps && self.settled_at(voltage, self.high_volts) =>
            {
                (SetpointState::Low, Some(Command::SetVoltage(self.low_volts)))
            }
            _ => (state, None),
        }
    }

    fn settled_at(&self, voltage: f32, target: f32) -> bool {
        (voltage - target).abs() < self.tolerance_volts
    }
}
