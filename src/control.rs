//! The sense, decide, actuate, report cycle.

use crate::{
    controller::Hysteresis,
    error::LinkError,
    link::{Connector, DeviceLink, PortError},
    reporter::Report,
    retry::{RetryPolicy, Sleep},
    types::{Command, Measurement, SetpointState},
};
use std::time::Duration;

/// Pause after each cycle before the next one starts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Timing of the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    /// Governs the connect attempts at startup.
    pub reconnect: RetryPolicy,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: RetryPolicy::default(),
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    pub voltage: Option<f32>,
    pub current: Option<f32>,
    /// Command that was issued and acknowledged.
    pub command: Option<Command>,
    /// Measurements delivered to the monitoring service.
    pub reported: Vec<Measurement>,
}

/// Owns the link, the reporter and the setpoint state, and drives them in sequence.
pub struct ControlLoop<C: Connector, R: Report, S: Sleep> {
    link: DeviceLink<C>,
    reporter: R,
    sleeper: S,
    hysteresis: Hysteresis,
    state: SetpointState,
    timing: LoopTiming,
}

impl<C: Connector, R: Report, S: Sleep> ControlLoop<C, R, S> {
    pub fn new(
        link: DeviceLink<C>,
        reporter: R,
        sleeper: S,
        hysteresis: Hysteresis,
        timing: LoopTiming,
    ) -> Self {
        Self {
            link,
            reporter,
            sleeper,
            hysteresis,
            state: SetpointState::default(),
            timing,
        }
    }

    pub fn state(&self) -> SetpointState {
        self.state
    }

    /// Connect to the regulator, retrying under the reconnect policy.
    ///
    /// With the default unlimited policy this only returns once connected.
    pub fn establish(&mut self) -> Result<(), LinkError<PortError<C>>> {
        let Self {
            link,
            sleeper,
            timing,
            ..
        } = self;
        let what = format!("Connecting to regulator at {}", link.address());
        timing.reconnect.run(sleeper, &what, || link.connect())
    }

    /// Run one cycle: read, decide, actuate, report.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        match self.link.read_voltage() {
            Ok(voltage) => {
                log::info!("Read voltage {:.3}V", voltage);
                outcome.voltage = Some(voltage);
            }
            Err(e) => log::error!("Error reading voltage: {}", e),
        }
        match self.link.read_current() {
            Ok(current) => {
                log::info!("Read current {:.3}A", current);
                outcome.current = Some(current);
            }
            Err(e) => log::error!("Error reading current: {}", e),
        }

        match (outcome.voltage, outcome.current) {
            (Some(voltage), Some(current)) => {
                outcome.command = self.actuate(voltage, current);
            }
            _ => log::debug!("Incomplete sample, no setpoint decision this cycle"),
        }

        let measurements = [
            outcome.voltage.map(Measurement::voltage),
            outcome.current.map(Measurement::current),
        ];
        for measurement in measurements.into_iter().flatten() {
            match self.reporter.report(&measurement) {
                Ok(()) => {
                    log::debug!("Reported {}", measurement);
                    outcome.reported.push(measurement);
                }
                Err(e) => log::error!("Failed to report {}: {}", measurement, e),
            }
        }

        outcome
    }

    /// Ask the controller and apply its command. The new state is only adopted once the
    /// regulator acknowledged the command, so a failed write is retried next cycle.
    fn actuate(&mut self, voltage: f32, current: f32) -> Option<Command> {
        let (next, command) = self.hysteresis.decide(self.state, voltage, current);
        let command = command?;
        let Command::SetVoltage(target) = command;
        match self.link.set_voltage(target) {
            Ok(()) => {
                log::info!(
                    "Setpoint {:?} -> {:?}: output set to {:.2}V ({:.3}V, {:.3}A)",
                    self.state,
                    next,
                    target,
                    voltage,
                    current
                );
                self.state = next;
                Some(command)
            }
            Err(e) => {
                log::error!("Error setting output voltage to {:.2}V: {}", target, e);
                None
            }
        }
    }

    /// One period of the loop: reconnect if needed, run a cycle, then pause.
    ///
    /// If the link dropped its handle after repeated failures, a single reconnect attempt is
    /// made; when it fails the cycle is skipped and `None` returned.
    pub fn tick(&mut self) -> Option<CycleOutcome> {
        if !self.link.is_connected() {
            if let Err(e) = self.link.connect() {
                log::warn!("Reconnect failed: {}", e);
                self.sleeper.sleep(self.timing.poll_interval);
                return None;
            }
        }
        let outcome = self.run_cycle();
        self.sleeper.sleep(self.timing.poll_interval);
        Some(outcome)
    }

    /// Poll forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }
}
