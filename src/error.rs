//! Error types for the regulator link, settings and reporting.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Register transaction error, generic over the port's error type.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error: {0:?}")]
    SerialError(I),
    #[error("Modbus protocol error: {0}")]
    ModbusError(rmodbus::ErrorKind),
    #[error("Invalid range")]
    InvalidRange,
    #[error("Invalid response received")]
    InvalidResponse,
}

impl<I: embedded_io::Error> From<rmodbus::ErrorKind> for Error<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        Error::ModbusError(err)
    }
}

/// Errors surfaced by [`DeviceLink`](crate::link::DeviceLink).
#[derive(Error, Debug)]
pub enum LinkError<I: embedded_io::Error> {
    #[error("serial link is disconnected")]
    Disconnected,
    #[error("failed to open {address}: {reason}")]
    Connect { address: String, reason: String },
    #[error("regulator transaction failed: {0}")]
    Regulator(Error<I>),
}

impl<I: embedded_io::Error> From<Error<I>> for LinkError<I> {
    fn from(err: Error<I>) -> Self {
        LinkError::Regulator(err)
    }
}

/// Problems with the settings file. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("section {0} not found in settings file")]
    MissingSection(String),
    #[error("{key} not found in section {section}")]
    MissingKey { section: String, key: &'static str },
    #[error("invalid monitor host {value:?}: {reason}")]
    InvalidHost { value: String, reason: String },
}

/// A measurement could not be delivered to the monitoring service.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}
