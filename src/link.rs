//! Ownership of the serial connection to the regulation module.

use crate::{
    error::LinkError,
    regulator::Regulator,
    scaling::{self, ScalingFactors},
};

/// Baud rate the regulation module is configured for.
pub const DEFAULT_BAUD_RATE: u32 = 4800;
/// Modbus unit id of the module.
pub const DEFAULT_UNIT_ID: u8 = 0x01;
/// Consecutive failed transactions after which the handle is dropped.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Opens serial ports. Implemented over `serialport` for the real device and mocked in tests.
pub trait Connector {
    type Port: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write;
    type Error: core::fmt::Display;

    fn open(&mut self, address: &str, baud_rate: u32) -> Result<Self::Port, Self::Error>;
}

/// Error type of the ports produced by a [`Connector`].
pub type PortError<C> = <<C as Connector>::Port as embedded_io::ErrorType>::Error;

/// Serial parameters for a [`DeviceLink`].
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub address: String,
    pub baud_rate: u32,
    pub unit_id: u8,
    pub scaling: ScalingFactors,
    /// `0` never drops the handle.
    pub failure_threshold: u32,
}

impl LinkSettings {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            unit_id: DEFAULT_UNIT_ID,
            scaling: ScalingFactors::default(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// The serial link to the regulator, either connected or disconnected.
///
/// Holds at most one open handle. Transaction failures are returned to the caller and counted;
/// once [`LinkSettings::failure_threshold`] failures happen in a row the handle is released so
/// the owner can reconnect.
pub struct DeviceLink<C: Connector> {
    connector: C,
    settings: LinkSettings,
    regulator: Option<Regulator<C::Port>>,
    consecutive_failures: u32,
}

impl<C: Connector> DeviceLink<C> {
    /// A disconnected link. Call [`Self::connect`] before issuing transactions.
    pub fn new(connector: C, settings: LinkSettings) -> Self {
        Self {
            connector,
            settings,
            regulator: None,
            consecutive_failures: 0,
        }
    }

    pub fn address(&self) -> &str {
        &self.settings.address
    }

    pub fn is_connected(&self) -> bool {
        self.regulator.is_some()
    }

    /// Open the serial port, replacing any handle already held.
    pub fn connect(&mut self) -> Result<(), LinkError<PortError<C>>> {
        self.disconnect();
        let port = self
            .connector
            .open(&self.settings.address, self.settings.baud_rate)
            .map_err(|e| LinkError::Connect {
                address: self.settings.address.clone(),
                reason: e.to_string(),
            })?;
        self.regulator = Some(Regulator::new(
            port,
            self.settings.unit_id,
            self.settings.scaling,
        ));
        self.consecutive_failures = 0;
        log::info!(
            "Connected to regulator at {} ({} baud)",
            self.settings.address,
            self.settings.baud_rate
        );
        Ok(())
    }

    /// Release the handle. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.regulator.take().is_some() {
            log::info!("Disconnected from regulator at {}", self.settings.address);
        }
    }

    /// Measured output voltage in volts.
    pub fn read_voltage(&mut self) -> Result<f32, LinkError<PortError<C>>> {
        let result = self.regulator()?.read_output_voltage_mv();
        self.track(result).map(scaling::mv_to_volts)
    }

    /// Measured output current in amps.
    pub fn read_current(&mut self) -> Result<f32, LinkError<PortError<C>>> {
        let result = self.regulator()?.read_current_ma();
        self.track(result).map(scaling::ma_to_amps)
    }

    /// Command the output voltage, in volts.
    pub fn set_voltage(&mut self, target: f32) -> Result<(), LinkError<PortError<C>>> {
        let result = self
            .regulator()?
            .set_output_voltage_mv(scaling::volts_to_mv(target));
        self.track(result)
    }

    fn regulator(&mut self) -> Result<&mut Regulator<C::Port>, LinkError<PortError<C>>> {
        self.regulator.as_mut().ok_or(LinkError::Disconnected)
    }

    /// Count consecutive failures and drop the handle at the threshold.
    fn track<T>(
        &mut self,
        result: crate::error::Result<T, PortError<C>>,
    ) -> Result<T, LinkError<PortError<C>>> {
        match result {
            Ok(value) => {
                self.consecutive_failures = 0;
                Ok(value)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                let threshold = self.settings.failure_threshold;
                if threshold > 0 && self.consecutive_failures >= threshold {
                    log::warn!(
                        "{} consecutive regulator failures, dropping link to {}",
                        self.consecutive_failures,
                        self.settings.address
                    );
                    self.disconnect();
                }
                Err(e.into())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn port(&self) -> Option<&C::Port> {
        self.regulator.as_ref().map(Regulator::interface)
    }
}
